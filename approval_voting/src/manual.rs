/*!

This is the long-form manual for `approval_voting` and `pavtally`.

## The voting method

Proportional approval voting (PAV) elects a set of `k` candidates from
ballots that each approve any number of candidates. A voter whose ballot
approves `n` of the winners contributes `1 + 1/2 + ... + 1/n` to the score
of that winner set: each additional approved winner is worth strictly less
than the previous one. The set of `k` candidates with the highest total
score across all ballots wins. This diminishing-returns rule is what makes
the outcome proportional: a bloc that already has representatives among the
winners gains little from one more.

The tally is exhaustive: every one of the `C(num_candidates, num_winners)`
candidate sets is scored. The cost grows combinatorially, so the number of
candidates and winners must stay modest (a few dozen candidates at most,
depending on `num_winners`).

Equal scores are possible, in particular for symmetric inputs, and are
ordered by the candidate names of the set compared as a sorted sequence.
Two runs of the tally over the same ballots always produce the same report.

## Input format

The expected input is a table with one column per candidate and one row per
ballot. The first row holds the candidate names. Every other cell holds an
approval mark:

| Alice | Bob | Charlie |
|-------|-----|---------|
| 1     | 0   | 1       |
| 0     | 1   | 0       |
| 1     |     | 0       |

The labels for "approved" and "not approved" default to `1` and `0` and can
be overridden per input file in the configuration. A cell that holds
neither label (such as the empty cell above) makes the whole row invalid:
the row is dropped from the tally and counted in `droppedBallots` of the
summary. It does not count as "not approved".

`pavtally` reads this table from a CSV file (`--input-type csv`) or from
the first worksheet of an Excel file (`--input-type xlsx`).

## Configuration

Simple elections only need flags:

```bash
pavtally -i ballots.csv --winners 3
```

For repeatable runs, a JSON configuration file can describe the whole
election:

```json
{
    "outputSettings": {
        "contestName": "Board election 2024",
        "contestDate": "2024-05-02"
    },
    "cvrFileSources": [
        {
            "provider": "csv",
            "filePath": "ballots.csv",
            "approvedLabel": "yes",
            "notApprovedLabel": "no"
        }
    ],
    "rules": {
        "numberOfWinners": 3,
        "numRanked": 10,
        "computePlurality": true
    }
}
```

File paths are relative to the configuration file. Multiple sources are
concatenated and must agree on their candidate columns. The flags
`--winners`, `--ranked` and `--input` override the corresponding
configuration entries.

## Output

The summary is printed to the standard output as JSON, and written to a
file with `--out`. It carries the ballot counts (total, distinct, dropped),
the optional plurality baseline (per-candidate approval totals, a
comparison reference that plays no role in the winner selection), the
`numRanked` top-scoring candidate sets, and the winner.

With `--reference`, the computed summary is compared to a previously
recorded one and the run fails if they differ.

*/

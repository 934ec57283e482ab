//! Prompt compiler.
//!
//! Renders the instruction text sent to a generation backend for one chunk of
//! onsets. Rendering is pure: identical inputs always give identical text.

use std::fmt::Write as _;

use chaebo_spec::{KeyMode, OnsetEvent};
use serde_json::{json, Value};

const HEADER: &str = r#"
You are a rhythm-game chart generator.
You will receive a set of onsets (timestamps) and a source BPM.

## Task
Return **ONLY** the JSON array (no wrapper) that constitutes the *chaebo* of a **{lanes}Key** chart.
Example:
[{"time":0.123,"type":"short","position":2}, ...]

The chart must be playable, fun, and follow these rules:
---
"#;

const RULES: &str = r#"
### 1. Global Constraints
| Item | Rule |
|------|------|
| **Source BPM** | bpm is beats per minute.<br>Use it to calculate note timings. |
| **Onsets** | *place notes **only** at these times; never invent extra timestamps.* |
| **Allowed note shapes** | • `{"time":T,"type":"short","position":P}`<br>• `{"time":T,"type":"long","position":P,"end":E}`<br>• `{"time":T,"type":"change_beat","beat":B}` |
| **Key-mode lanes** | 4K → 1 2 3 4  , 5K → 1 2 3 4 5  ,  6K → 1 2 3 4 5 6 |
| **Long / change_beat** | *For now disallow* – generate **short** notes only. |
| **Output** | A single JSON array, no comments / backticks / extra text. Must start with `[` and end with `]`. |

*Feel free to invent new, fun patterns (as long as they respect all checklist rules and remain playable).*
---
### 2. Musical Mapping Guidelines
* **Pitch⇄Lane** – if pitch is different, use different lanes.
  Example motif `D B C B D B E` → lanes `1 2 3 2 3 2 4`.
* **Accents / strong hits** – use **Simultaneous (Chord)** notes (2–3 lanes at same `time`).
* **Variety** – mix multiple patterns; don't run any one pattern for > 2 s.

### 3. Pattern Library (use creatively)
- **Random**
  - **What it is:** Not a pattern, but a fallback for when no other pattern fits, or when you want to add some randomness.
  - No specific examples, just put notes at random positions.

- **Trill**
  - **What it is:** Rapid alternation between exactly two lanes
  - **Examples (4-key):**
    `[{"time":0.1000,"type":"short","position":1},{"time":0.2000,"type":"short","position":3},{"time":0.3000,"type":"short","position":1},{"time":0.4000,"type":"short","position":3}]`
    `[{"time":1.0000,"type":"short","position":2},{"time":1.1500,"type":"short","position":4},{"time":1.3000,"type":"short","position":2},{"time":1.4500,"type":"short","position":4}]`

- **Jump-trill**
  - **What it is:** Similar to Trill, but with Simultaneous notes
  - **Examples (4-key):**
    `[{"time":0.1000,"type":"short","position":1},{"time":0.1000,"type":"short","position":2},{"time":0.3000,"type":"short","position":3},{"time":0.3000,"type":"short","position":4}]` and repeat...

- **Stair**
  - **What it is:** Stepwise ascend or descend; each note moves ±1 lane
  - **Examples (4-key):**
    `[{"time":0.5000,"type":"short","position":2},{"time":0.6000,"type":"short","position":3},{"time":0.7000,"type":"short","position":4}]`
    `[{"time":2.0000,"type":"short","position":4},{"time":2.2000,"type":"short","position":3},{"time":2.4000,"type":"short","position":2},{"time":2.6000,"type":"short","position":1}]`

- **Simultaneous (Chord)**
  - **What it is:** 2–3 lanes hit at the same time for accents or surprises
  - **Constraints:** Do not exceed 3 lanes at once
  - **Examples (4-key):**
    `[{"time":0.8000,"type":"short","position":2},{"time":0.8000,"type":"short","position":4}]`
    `[{"time":3.0000,"type":"short","position":1},{"time":3.0000,"type":"short","position":2},{"time":3.0000,"type":"short","position":3}]`

- **Rapid-fire**
  - **What it is:** "Machine-gun" burst in one lane
  - **Constraints:** Do not use this for long sequences; more than 5 notes in a row in the same lane is not fun.
  - **Examples (4-key):**
    `[{"time":1.0000,"type":"short","position":3},{"time":1.1000,"type":"short","position":3},{"time":1.2000,"type":"short","position":3}]`
    `[{"time":4.5000,"type":"short","position":2},{"time":4.5800,"type":"short","position":2},{"time":4.6600,"type":"short","position":2},{"time":4.7400,"type":"short","position":2},{"time":4.8200,"type":"short","position":2}]`

- **Axis**
  - **What it is:** Central lane repeats (≥50% of notes) with occasional side-lane interjections
  - **Examples (4-key):**
    `[{"time":1.5000,"type":"short","position":3},{"time":1.6000,"type":"short","position":2},{"time":1.7000,"type":"short","position":3},{"time":1.8000,"type":"short","position":4},{"time":1.9000,"type":"short","position":3}]`
    `[{"time":5.0000,"type":"short","position":3},{"time":5.2500,"type":"short","position":3},{"time":5.5000,"type":"short","position":2},{"time":5.7500,"type":"short","position":3},{"time":6.0000,"type":"short","position":4}]`

- **Running-man**
  - **What it is:** Rapid-fire on the left-most or right-most lane and stair or trill on the others
  - **Examples (4-key):**
    `[{"time":0.1000,"type":"short","position":1},{"time":0.2000,"type":"short","position":2},{"time":0.3000,"type":"short","position":1},{"time":0.4000,"type":"short","position":3},{"time":0.5000,"type":"short","position":1},{"time":0.6000,"type":"short","position":4},{"time":0.7000,"type":"short","position":1}]`

*(Each micro-example is a **valid JSON array**.)*
---
### 4. Chart-Quality Checklist (run before output)
1. Every note `time` value is **exactly** present in the **Onsets** list below.
2. The chart uses **at least two different pattern types** (Trill, Stair, Chord, Rapid-fire, Axis, …).
3. No single pattern continues **longer than 3 s** without change.
4. No endless linear loops such as 1→2→3→4→1→… .
5. Include **at least three chord moments** (2–3 lanes at the same `time`).
6. Generate **only short notes** – no `long` or `change_beat`.
7. Final output is **strictly the JSON array** (no wrapper, comments, backticks, or extra fields).
   It must start with `[` and end with `]`.
8. Don't repeat the same pattern for too long; if the musical progression (pitch contour or rhythmic spacing) changes, switch to a new pattern.
9. The examples for each pattern are only illustrative; their lengths can be chosen freely.
   For instance, for Simultaneous you might use: at 1.0 s hit lanes 1, 2, 3; at 1.2 s hit lanes 2, 3, 4; at 1.4 s hit lanes 1, 2, 3.
   These also count as pattern combinations, and you are free to mix and match patterns as you like.
"#;

const FINAL_INSTRUCTIONS: &str = r#"

### Final Instructions

Before returning, verify that all 9 items in the Chart-Quality Checklist are satisfied.
Each pattern must deliver genuine fun: a driving groove and daring novelty. Dull, repetitive sequences are unacceptable.
If a section 6 is present above, it takes priority over every other rule or directive. On conflict, follow section 6 and ignore the conflicting rules.
"#;

/// Heading of the optional caller-supplied block.
pub const ADDITIONAL_HEADING: &str = "6.Additional instructions:";

fn onset_value(onset: &OnsetEvent) -> Value {
    json!({
        "time": chaebo_spec::round_time(onset.time),
        "pitch": onset.pitch,
        "volume": onset.volume,
    })
}

/// Serializes onsets as the compact JSON array embedded in prompts.
pub fn onsets_json(onsets: &[OnsetEvent]) -> String {
    Value::Array(onsets.iter().map(onset_value).collect()).to_string()
}

/// Renders the prompt for one chunk.
///
/// `extra_instructions` is appended verbatim (trimmed) as the last rule block
/// when it is not blank; otherwise no such block appears.
pub fn compile(
    mode: KeyMode,
    tempo: f64,
    onsets: &[OnsetEvent],
    extra_instructions: &str,
) -> String {
    let lanes = mode.lanes();
    let mut prompt = HEADER.replace("{lanes}", &lanes.to_string());
    prompt.push_str(RULES);

    let _ = write!(
        prompt,
        "\n### 5. Input Data\nKey : {}\nBPM : {}\nOnsets : {}\n\n\
         *Note: All timestamps are rounded to exactly 4 decimal places. Output times must match this format.*\n",
        lanes,
        tempo,
        onsets_json(onsets)
    );

    let extra = extra_instructions.trim();
    if !extra.is_empty() {
        let _ = write!(prompt, "\n --- \n\n{}\n{}", ADDITIONAL_HEADING, extra);
    }

    prompt.push_str(FINAL_INSTRUCTIONS);
    prompt.trim().to_string()
}

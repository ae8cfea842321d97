//! Test fixtures for graph reads

use crate::Graph;
use serde_json::{json, Value};

/// A small catalogue where lists point at shared entities through refs.
pub fn catalogue_seed() -> Value {
    json!({
        "genreLists": {
            "0": { "$type": "ref", "value": ["genresById", 123] },
            "1": { "$type": "ref", "value": ["genresById", 522] },
            "length": 2
        },
        "genresById": {
            "123": {
                "name": "Comedy",
                "titles": {
                    "0": { "$type": "ref", "value": ["titlesById", 1] }
                }
            },
            "522": { "name": "Drama", "titles": {} }
        },
        "titlesById": {
            "1": {
                "name": "Grand Hotel",
                "rating": { "$type": "atom", "value": 4 },
                "tags": ["classic", "ensemble"],
                "boxart": { "$type": "atom" },
                "blurb": { "$type": "error", "value": "upstream timeout" }
            }
        }
    })
}

pub fn catalogue() -> Graph {
    Graph::from_json(&catalogue_seed())
}

/// `a -> b -> a`, plus a self-loop at `self`.
pub fn cyclic() -> Graph {
    Graph::from_json(&json!({
        "a": { "$type": "ref", "value": ["b"] },
        "b": { "$type": "ref", "value": ["a"] },
        "self": { "$type": "ref", "value": ["self"] },
        "deep": { "$type": "ref", "value": ["deep", "x"] },
        "ok": 1
    }))
}

/// A chain of `len` references ending at the value `"end"`.
pub fn ref_chain(len: usize) -> Graph {
    let mut seed = serde_json::Map::new();
    for i in 0..len {
        seed.insert(
            format!("n{i}"),
            json!({ "$type": "ref", "value": [format!("n{}", i + 1)] }),
        );
    }
    seed.insert(format!("n{len}"), json!("end"));
    Graph::from_json(&Value::Object(seed))
}

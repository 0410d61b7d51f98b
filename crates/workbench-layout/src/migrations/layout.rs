use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value, json};
use workbench_core::{Migrator, StepError, codec, migrate_value};

use super::{for_each_element, is_part, views_mut};
use crate::activity::{DEFAULT_PANEL_HEIGHT, DEFAULT_PANEL_RATIO, DEFAULT_PANEL_WIDTH};
use crate::model::numeric_suffix;
use crate::outlets::parse_path;

pub(super) const MIGRATORS: [Migrator; 5] = [
    Migrator {
        from: 1,
        description: "group grids",
        migrate: group_grids,
    },
    Migrator {
        from: 2,
        description: "parse view outlets",
        migrate: parse_view_outlets,
    },
    Migrator {
        from: 3,
        description: "add activity layout",
        migrate: add_activity_layout,
    },
    Migrator {
        from: 4,
        description: "make view ids unique across grids",
        migrate: dedupe_view_ids,
    },
    Migrator {
        from: 5,
        description: "split outlet paths into segments",
        migrate: segment_outlet_paths,
    },
];

/// Activity layouts nested by the v4 step are written at this version.
const ACTIVITY_LAYOUT_V1: u32 = 1;
const VIEW_ID_PREFIX: &str = "view.";

fn document(value: &mut Value) -> Result<&mut Map<String, Value>, StepError> {
    value
        .as_object_mut()
        .ok_or_else(|| StepError::new("layout is not an object"))
}

fn group_grids(json: &str) -> Result<String, StepError> {
    migrate_value(json, |value| {
        let layout = document(value)?;
        let main = layout
            .remove("workbenchGrid")
            .ok_or_else(|| StepError::new("layout has no workbenchGrid"))?;
        let mut grids = Map::new();
        let _ = grids.insert("main".to_owned(), main);
        if let Some(main_area) = layout.remove("mainAreaGrid").filter(|grid| !grid.is_null()) {
            let _ = grids.insert("mainArea".to_owned(), main_area);
        }
        let _ = layout.insert("grids".to_owned(), Value::Object(grids));
        Ok(())
    })
}

fn parse_view_outlets(json: &str) -> Result<String, StepError> {
    migrate_value(json, |value| {
        let layout = document(value)?;
        let outlets = match layout.remove("viewOutlets") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(Value::String(raw)) => serde_json::from_str::<Value>(&raw)?,
            Some(_) => return Err(StepError::new("viewOutlets is not a JSON string")),
        };
        if !outlets.is_object() {
            return Err(StepError::new("viewOutlets does not hold an object"));
        }
        let _ = layout.insert("outlets".to_owned(), outlets);
        Ok(())
    })
}

fn add_activity_layout(json: &str) -> Result<String, StepError> {
    migrate_value(json, |value| {
        let layout = document(value)?;
        let activity_layout = json!({
            "toolbars": {},
            "panels": {
                "left": {"size": DEFAULT_PANEL_WIDTH, "ratio": DEFAULT_PANEL_RATIO},
                "right": {"size": DEFAULT_PANEL_WIDTH, "ratio": DEFAULT_PANEL_RATIO},
                "bottom": {"size": DEFAULT_PANEL_HEIGHT, "ratio": DEFAULT_PANEL_RATIO},
            }
        });
        let _ = layout.insert(
            "activityLayout".to_owned(),
            Value::String(codec::encode(&activity_layout.to_string(), ACTIVITY_LAYOUT_V1)),
        );
        Ok(())
    })
}

/// A grid envelope opened for editing.
struct OpenGrid {
    key: String,
    version: u32,
    grid: Value,
}

/// Grid keys in precedence order: `main`, `mainArea`, then the activity
/// grids by name. Earlier grids keep their view ids.
fn precedence(keys: impl Iterator<Item = String>) -> Vec<String> {
    let mut keys = keys.collect::<Vec<_>>();
    keys.sort_by_key(|key| match key.as_str() {
        "main" => (0, String::new()),
        "mainArea" => (1, String::new()),
        other => (2, other.to_owned()),
    });
    keys
}

fn dedupe_view_ids(json: &str) -> Result<String, StepError> {
    migrate_value(json, |value| {
        let layout = document(value)?;
        let Some(Value::Object(envelopes)) = layout.get("grids") else {
            return Err(StepError::new("layout has no grids object"));
        };

        let mut grids = Vec::new();
        for key in precedence(envelopes.keys().cloned()) {
            let encoded = envelopes
                .get(&key)
                .and_then(Value::as_str)
                .ok_or_else(|| StepError::new(format!("grid {key} is not an envelope")))?;
            let envelope = codec::decode(encoded)
                .map_err(|error| StepError::new(format!("grid {key}: {error}")))?;
            grids.push(OpenGrid {
                key,
                version: envelope.version,
                grid: serde_json::from_str(&envelope.json)?,
            });
        }

        let mut next = 1;
        for open in &mut grids {
            for_each_element(&mut open.grid, |element| {
                for view in views_mut(element) {
                    if let Some(n) = view
                        .get("id")
                        .and_then(Value::as_str)
                        .and_then(|id| numeric_suffix(id, VIEW_ID_PREFIX))
                    {
                        next = next.max(n + 1);
                    }
                }
                Ok(())
            })?;
        }

        let mut seen = BTreeSet::new();
        let mut renamed = BTreeMap::new();
        for open in &mut grids {
            for_each_element(&mut open.grid, |element| {
                if !is_part(element) {
                    return Ok(());
                }
                let mut renamed_here = Vec::new();
                for view in views_mut(element) {
                    let Some(id) = view.get("id").and_then(Value::as_str).map(str::to_owned)
                    else {
                        return Err(StepError::new("view has no id"));
                    };
                    if seen.insert(id.clone()) {
                        continue;
                    }
                    let fresh = format!("{VIEW_ID_PREFIX}{next}");
                    next += 1;
                    let _ = view.insert("id".to_owned(), Value::String(fresh.clone()));
                    let _ = seen.insert(fresh.clone());
                    renamed_here.push((id, fresh));
                }
                for (old, fresh) in renamed_here {
                    if element.get("activeViewId").and_then(Value::as_str) == Some(old.as_str()) {
                        let _ = element.insert("activeViewId".to_owned(), Value::String(fresh.clone()));
                    }
                    let _ = renamed.insert(fresh, old);
                }
                Ok(())
            })?;
        }

        let mut reencoded = Map::new();
        for open in grids {
            let _ = reencoded.insert(
                open.key,
                Value::String(codec::encode(&open.grid.to_string(), open.version)),
            );
        }
        let _ = layout.insert("grids".to_owned(), Value::Object(reencoded));

        if let Some(Value::Object(outlets)) = layout.get_mut("outlets") {
            for (fresh, old) in renamed {
                if let Some(outlet) = outlets.get(&old).cloned() {
                    let _ = outlets.insert(fresh, outlet);
                }
            }
        }
        Ok(())
    })
}

fn segment_outlet_paths(json: &str) -> Result<String, StepError> {
    migrate_value(json, |value| {
        let layout = document(value)?;
        let Some(Value::Object(outlets)) = layout.get_mut("outlets") else {
            return Ok(());
        };
        for (key, outlet) in outlets.iter_mut() {
            match outlet {
                Value::String(path) => {
                    let segments = serde_json::to_value(parse_path(path))?;
                    *outlet = segments;
                }
                Value::Array(_) => {}
                _ => return Err(StepError::new(format!("outlet {key} is not a path"))),
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(step: fn(&str) -> Result<String, StepError>, input: Value) -> Value {
        let output = step(&input.to_string()).expect("migrated");
        serde_json::from_str(&output).expect("json")
    }

    fn grid_envelope(views: &[&str], active: &str, version: u32) -> String {
        let grid = json!({
            "root": {"type": "MPart", "id": format!("part.{active}"), "structural": true,
                "views": views.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
                "activeViewId": active},
            "activePartId": format!("part.{active}")
        });
        codec::encode(&grid.to_string(), version)
    }

    fn open(envelope: &Value) -> (u32, Value) {
        let decoded = codec::decode(envelope.as_str().expect("envelope")).expect("decodable");
        (
            decoded.version,
            serde_json::from_str(&decoded.json).expect("json"),
        )
    }

    #[test]
    fn grids_are_grouped() {
        let out = run(
            group_grids,
            json!({"workbenchGrid": "a", "mainAreaGrid": "b", "viewOutlets": "{}"}),
        );
        assert_eq!(out["grids"], json!({"main": "a", "mainArea": "b"}));
        assert!(out.get("workbenchGrid").is_none());
    }

    #[test]
    fn missing_workbench_grid_is_malformed() {
        assert!(group_grids(&json!({"mainAreaGrid": "b"}).to_string()).is_err());
    }

    #[test]
    fn view_outlets_string_becomes_object() {
        let out = run(
            parse_view_outlets,
            json!({"grids": {}, "viewOutlets": "{\"view.1\":\"todos/1\"}"}),
        );
        assert_eq!(out["outlets"], json!({"view.1": "todos/1"}));
        assert!(out.get("viewOutlets").is_none());
    }

    #[test]
    fn activity_layout_is_added_as_envelope() {
        let out = run(add_activity_layout, json!({"grids": {}, "outlets": {}}));
        let (version, activity) = open(&out["activityLayout"]);
        assert_eq!(version, ACTIVITY_LAYOUT_V1);
        assert_eq!(activity["panels"]["left"]["size"], DEFAULT_PANEL_WIDTH);
        assert_eq!(activity["toolbars"], json!({}));
    }

    #[test]
    fn colliding_view_ids_are_renamed_in_later_grids() {
        let out = run(
            dedupe_view_ids,
            json!({
                "grids": {
                    "mainArea": grid_envelope(&["view.1", "view.2"], "view.2", 5),
                    "main": grid_envelope(&["view.2"], "view.2", 6),
                    "activity.1": grid_envelope(&["view.1"], "view.1", 6),
                },
                "outlets": {"view.1": "a", "view.2": "b"}
            }),
        );

        let (main_version, main) = open(&out["grids"]["main"]);
        assert_eq!(main_version, 6);
        assert_eq!(main["root"]["views"][0]["id"], "view.2");

        let (area_version, area) = open(&out["grids"]["mainArea"]);
        assert_eq!(area_version, 5);
        assert_eq!(area["root"]["views"][0]["id"], "view.1");
        assert_eq!(area["root"]["views"][1]["id"], "view.3");
        assert_eq!(area["root"]["activeViewId"], "view.3");

        let (_, activity) = open(&out["grids"]["activity.1"]);
        assert_eq!(activity["root"]["views"][0]["id"], "view.4");
        assert_eq!(activity["root"]["activeViewId"], "view.4");

        assert_eq!(out["outlets"]["view.3"], "b");
        assert_eq!(out["outlets"]["view.4"], "a");
        assert_eq!(out["outlets"]["view.1"], "a");
    }

    #[test]
    fn unique_view_ids_are_untouched() {
        let input = json!({
            "grids": {
                "main": grid_envelope(&["view.1"], "view.1", 6),
                "mainArea": grid_envelope(&["view.2"], "view.2", 6),
            },
            "outlets": {}
        });
        let out = run(dedupe_view_ids, input.clone());
        assert_eq!(out["grids"]["main"], input["grids"]["main"]);
    }

    #[test]
    fn outlet_paths_become_segments() {
        let out = run(
            segment_outlet_paths,
            json!({"outlets": {"view.1": "todos;filter=open/3", "view.2": []}}),
        );
        assert_eq!(
            out["outlets"]["view.1"],
            json!([{"path": "todos", "parameters": {"filter": "open"}}, {"path": "3"}])
        );
        assert_eq!(out["outlets"]["view.2"], json!([]));
    }
}

use serde_json::{Map, Value};
use workbench_core::{Migrator, StepError, migrate_value};

use super::{for_each_element, is_part, is_tree_node, views_mut};
use crate::model::{ElementId, MAIN_AREA, NavigationId};

pub(super) const MIGRATORS: [Migrator; 6] = [
    Migrator {
        from: 1,
        description: "assign tree node ids",
        migrate: assign_tree_node_ids,
    },
    Migrator {
        from: 2,
        description: "default parts to structural",
        migrate: default_structural,
    },
    Migrator {
        from: 3,
        description: "nest view navigation",
        migrate: nest_view_navigation,
    },
    Migrator {
        from: 4,
        description: "split css classes",
        migrate: split_css_classes,
    },
    Migrator {
        from: 5,
        description: "add reference part",
        migrate: add_reference_part,
    },
    Migrator {
        from: 6,
        description: "identify part navigation",
        migrate: identify_part_navigation,
    },
];

fn assign_tree_node_ids(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        for_each_element(grid, |element| {
            if is_tree_node(element) && !element.contains_key("id") {
                let _ = element.insert(
                    "id".to_owned(),
                    Value::String(ElementId::generate_node().to_string()),
                );
            }
            Ok(())
        })
    })
}

fn default_structural(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        for_each_element(grid, |element| {
            if is_part(element) {
                let _ = element
                    .entry("structural")
                    .or_insert(Value::Bool(true));
            }
            Ok(())
        })
    })
}

fn nest_view_navigation(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        for_each_element(grid, |element| {
            for view in views_mut(element) {
                let hint = view.remove("navigationHint");
                let data = view.remove("navigationData");
                if hint.is_none() && data.is_none() {
                    continue;
                }
                let mut navigation = Map::new();
                let _ = navigation.insert(
                    "id".to_owned(),
                    Value::String(NavigationId::generate().to_string()),
                );
                if let Some(hint) = hint.filter(|hint| !hint.is_null()) {
                    let _ = navigation.insert("hint".to_owned(), hint);
                }
                if let Some(data) = data.filter(|data| !data.is_null()) {
                    if !data.is_object() {
                        return Err(StepError::new("view navigationData is not an object"));
                    }
                    let _ = navigation.insert("data".to_owned(), data);
                }
                let _ = view.insert("navigation".to_owned(), Value::Object(navigation));
            }
            Ok(())
        })
    })
}

fn split_css_class(holder: &mut Map<String, Value>) -> Result<(), StepError> {
    match holder.get("cssClass") {
        Some(Value::String(classes)) => {
            let split = classes
                .split_whitespace()
                .map(|class| Value::String(class.to_owned()))
                .collect();
            let _ = holder.insert("cssClass".to_owned(), Value::Array(split));
            Ok(())
        }
        None | Some(Value::Null | Value::Array(_)) => Ok(()),
        Some(_) => Err(StepError::new("cssClass is neither a string nor an array")),
    }
}

fn split_css_classes(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        for_each_element(grid, |element| {
            if is_part(element) {
                split_css_class(element)?;
                for view in views_mut(element) {
                    split_css_class(view)?;
                }
            }
            Ok(())
        })
    })
}

fn add_reference_part(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        let active = grid
            .get("activePartId")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let mut has_main_area = false;
        let mut active_is_part = false;
        for_each_element(grid, |element| {
            let id = element.get("id").and_then(Value::as_str);
            has_main_area |= is_part(element) && id == Some(MAIN_AREA);
            active_is_part |= is_part(element) && id.is_some() && id == active.as_deref();
            Ok(())
        })?;
        let Value::Object(document) = grid else {
            return Err(StepError::new("grid is not an object"));
        };
        if document.contains_key("referencePartId") {
            return Ok(());
        }
        let reference = if has_main_area {
            Some(Value::String(MAIN_AREA.to_owned()))
        } else {
            active.filter(|_| active_is_part).map(Value::String)
        };
        if let Some(reference) = reference {
            let _ = document.insert("referencePartId".to_owned(), reference);
        }
        Ok(())
    })
}

fn identify_part_navigation(json: &str) -> Result<String, StepError> {
    migrate_value(json, |grid| {
        for_each_element(grid, |element| {
            if !is_part(element) {
                return Ok(());
            }
            if let Some(navigation) = element.get_mut("navigation").and_then(Value::as_object_mut)
                && !navigation.contains_key("id")
            {
                let _ = navigation.insert(
                    "id".to_owned(),
                    Value::String(NavigationId::generate().to_string()),
                );
            }
            Ok(())
        })
    })
}

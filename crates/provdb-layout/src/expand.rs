//! Argobots configuration expansion for multi-database provdb servers.
//!
//! A base Margo config carries one template (pool, xstream) pair at index 1
//! of `argobots.pools` / `argobots.xstreams`. The expander removes the
//! templates and appends one renamed copy of the pair per database, so each
//! database gets a dedicated pool drained by a dedicated execution stream.
//!
//! Everything else in the document is opaque to us and passes through
//! untouched, which is why this operates on raw JSON values rather than a
//! typed schema.

use std::path::Path;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config has no `argobots` object")]
    MissingArgobots,
    #[error("`argobots.{0}` is missing or not an array")]
    MissingList(&'static str),
    #[error("`argobots.{list}` has {len} entries, expected at least 2 (index 1 is the template)")]
    TooFewEntries { list: &'static str, len: usize },
    #[error("`argobots.{0}[1]` template is not an object")]
    TemplateNotObject(&'static str),
    #[error("xstream template has no `scheduler` object")]
    MissingScheduler,
}

/// Read a base config from `path` and expand it for `num_dbs` databases.
pub fn expand_config_file(path: &Path, num_dbs: u32) -> Result<Value, ExpandError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExpandError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = serde_json::from_str(&text).map_err(|source| ExpandError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    expand_config(config, num_dbs)
}

/// Replace the template (pool, xstream) pair at index 1 with `num_dbs`
/// independent copies named `pool_s<i>` / `stream_s<i>`, each stream
/// scheduling exclusively from its own pool.
pub fn expand_config(mut config: Value, num_dbs: u32) -> Result<Value, ExpandError> {
    let argobots = config
        .get_mut("argobots")
        .and_then(Value::as_object_mut)
        .ok_or(ExpandError::MissingArgobots)?;

    // Check both lists up front so a bad `xstreams` can't leave `pools`
    // half-rewritten.
    check_list(argobots, "pools")?;
    check_list(argobots, "xstreams")?;

    let pool_template = take_template(argobots, "pools")?;
    let xstream_template = take_template(argobots, "xstreams")?;
    if !xstream_template
        .get("scheduler")
        .is_some_and(Value::is_object)
    {
        return Err(ExpandError::MissingScheduler);
    }

    for i in 0..num_dbs {
        let pool_name = format!("pool_s{i}");
        let stream_name = format!("stream_s{i}");

        let mut pool = pool_template.clone();
        pool.insert("name".to_string(), json!(pool_name));

        let mut xstream = xstream_template.clone();
        xstream.insert("name".to_string(), json!(stream_name));
        if let Some(scheduler) = xstream.get_mut("scheduler").and_then(Value::as_object_mut) {
            scheduler.insert("pools".to_string(), json!([pool_name]));
        }

        push_entry(argobots, "pools", Value::Object(pool));
        push_entry(argobots, "xstreams", Value::Object(xstream));
    }

    debug!(num_dbs, "expanded argobots pool/xstream pairs");
    Ok(config)
}

fn check_list(argobots: &Map<String, Value>, list: &'static str) -> Result<(), ExpandError> {
    let arr = argobots
        .get(list)
        .and_then(Value::as_array)
        .ok_or(ExpandError::MissingList(list))?;
    if arr.len() < 2 {
        return Err(ExpandError::TooFewEntries { list, len: arr.len() });
    }
    Ok(())
}

fn take_template(
    argobots: &mut Map<String, Value>,
    list: &'static str,
) -> Result<Map<String, Value>, ExpandError> {
    // Both checked by check_list before any mutation.
    let arr = argobots
        .get_mut(list)
        .and_then(Value::as_array_mut)
        .ok_or(ExpandError::MissingList(list))?;
    match arr.remove(1) {
        Value::Object(map) => Ok(map),
        _ => Err(ExpandError::TemplateNotObject(list)),
    }
}

fn push_entry(argobots: &mut Map<String, Value>, list: &'static str, entry: Value) {
    if let Some(arr) = argobots.get_mut(list).and_then(Value::as_array_mut) {
        arr.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn base_config() -> Value {
        json!({
            "output": "provdb.json",
            "margo": { "progress_timeout_ub_msec": 100 },
            "argobots": {
                "abt_mem_max_num_stacks": 8,
                "pools": [
                    { "name": "__primary__", "kind": "fifo_wait", "access": "mpmc" },
                    { "name": "__template__", "kind": "fifo_wait", "access": "mpmc" },
                    { "name": "rpc_pool", "kind": "fifo_wait", "access": "mpmc" }
                ],
                "xstreams": [
                    {
                        "name": "__primary__",
                        "scheduler": { "type": "basic_wait", "pools": ["__primary__"] }
                    },
                    {
                        "name": "__template__",
                        "cpubind": 0,
                        "scheduler": { "type": "basic_wait", "pools": ["__template__"] }
                    }
                ]
            }
        })
    }

    fn names(config: &Value, list: &str) -> Vec<String> {
        config["argobots"][list]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn expands_three_databases() {
        let expanded = expand_config(base_config(), 3).unwrap();

        assert_eq!(
            names(&expanded, "pools"),
            ["__primary__", "rpc_pool", "pool_s0", "pool_s1", "pool_s2"]
        );
        assert_eq!(
            names(&expanded, "xstreams"),
            ["__primary__", "stream_s0", "stream_s1", "stream_s2"]
        );

        for (i, xstream) in expanded["argobots"]["xstreams"]
            .as_array()
            .unwrap()
            .iter()
            .skip(1)
            .enumerate()
        {
            assert_eq!(
                xstream["scheduler"]["pools"],
                json!([format!("pool_s{i}")])
            );
        }
    }

    #[test]
    fn every_scheduler_references_an_existing_pool() {
        let expanded = expand_config(base_config(), 4).unwrap();
        let pools = names(&expanded, "pools");

        for xstream in expanded["argobots"]["xstreams"].as_array().unwrap() {
            for pool_ref in xstream["scheduler"]["pools"].as_array().unwrap() {
                assert!(pools.contains(&pool_ref.as_str().unwrap().to_string()));
            }
        }
    }

    #[test]
    fn unrelated_content_passes_through() {
        let expanded = expand_config(base_config(), 2).unwrap();

        assert_eq!(expanded["output"], json!("provdb.json"));
        assert_eq!(expanded["margo"]["progress_timeout_ub_msec"], json!(100));
        assert_eq!(expanded["argobots"]["abt_mem_max_num_stacks"], json!(8));
        // Template carried its non-name fields into each copy.
        assert_eq!(expanded["argobots"]["xstreams"][1]["cpubind"], json!(0));
    }

    #[test]
    fn clones_are_independent() {
        let mut expanded = expand_config(base_config(), 2).unwrap();

        expanded["argobots"]["pools"][2]["kind"] = json!("prio_wait");

        assert_eq!(expanded["argobots"]["pools"][2]["name"], json!("pool_s0"));
        assert_eq!(expanded["argobots"]["pools"][3]["kind"], json!("fifo_wait"));
    }

    #[test]
    fn zero_copies_just_drops_the_templates() {
        let expanded = expand_config(base_config(), 0).unwrap();
        assert_eq!(names(&expanded, "pools"), ["__primary__", "rpc_pool"]);
        assert_eq!(names(&expanded, "xstreams"), ["__primary__"]);
    }

    #[test]
    fn missing_argobots_section_fails() {
        let err = expand_config(json!({ "margo": {} }), 1).unwrap_err();
        assert!(matches!(err, ExpandError::MissingArgobots));
    }

    #[test]
    fn short_pool_list_fails() {
        let mut config = base_config();
        config["argobots"]["pools"] = json!([{ "name": "__primary__" }]);

        let err = expand_config(config, 1).unwrap_err();
        assert!(matches!(
            err,
            ExpandError::TooFewEntries { list: "pools", len: 1 }
        ));
    }

    #[test]
    fn short_xstream_list_leaves_pools_untouched() {
        let mut config = base_config();
        config["argobots"]["xstreams"] = json!([]);

        let err = expand_config(config, 1).unwrap_err();
        assert!(matches!(
            err,
            ExpandError::TooFewEntries { list: "xstreams", len: 0 }
        ));
    }

    #[test]
    fn non_array_pools_fails() {
        let mut config = base_config();
        config["argobots"]["pools"] = json!("oops");

        let err = expand_config(config, 1).unwrap_err();
        assert!(matches!(err, ExpandError::MissingList("pools")));
    }

    #[test]
    fn expand_config_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", base_config()).unwrap();

        let expanded = expand_config_file(file.path(), 1).unwrap();
        assert_eq!(names(&expanded, "pools"), ["__primary__", "rpc_pool", "pool_s0"]);
    }

    #[test]
    fn unreadable_file_fails_with_read_error() {
        let err = expand_config_file(Path::new("/nonexistent/margo.json"), 1).unwrap_err();
        assert!(matches!(err, ExpandError::Read { .. }));
    }

    #[test]
    fn invalid_json_fails_with_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = expand_config_file(file.path(), 1).unwrap_err();
        assert!(matches!(err, ExpandError::Parse { .. }));
    }
}

//! `reroutes match`: evaluate the location-changed predicate against
//! pathnames and show the captured parameters.

use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;

use reroutes_core::{Location, LocationAction, MatchOptions, Reroute};

use crate::cli::{GlobalOpts, MatchArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub path: String,
    pub matched: bool,
    pub params: Map<String, Value>,
}

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Params")]
    params: String,
}

impl MatchRow {
    fn new(record: &MatchRecord, color: bool) -> Self {
        let params = record
            .params
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            path: record.path.clone(),
            matched: output::flag(record.matched, color),
            params,
        }
    }
}

fn options(args: &MatchArgs) -> MatchOptions {
    MatchOptions {
        sensitive: args.sensitive,
        strict: args.strict,
        start: !args.anywhere,
        end: args.end,
    }
}

/// Test every path as if a `locationChanged` notification reported it.
pub fn evaluate(args: &MatchArgs) -> Result<Vec<MatchRecord>, CliError> {
    let reroute = Reroute::new("match");
    let matcher = reroute
        .location_changed_matcher_with(&args.pattern, options(args))
        .map_err(|source| CliError::Pattern {
            pattern: args.pattern.clone(),
            source,
        })?;

    Ok(args
        .paths
        .iter()
        .map(|path| {
            let action = reroute
                .actions()
                .location_changed(LocationAction::Pop, Location::parse(path, None));
            let params = matcher
                .params(&action)
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            MatchRecord {
                path: path.clone(),
                matched: matcher.matches(&action),
                params,
            }
        })
        .collect())
}

pub fn handle(args: &MatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut records = evaluate(args)?;
    let any_matched = records.iter().any(|r| r.matched);

    // Plain output lists matching paths only, grep style.
    if matches!(global.output, OutputFormat::Plain) {
        records.retain(|r| r.matched);
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &records,
        |r| MatchRow::new(r, color),
        |r| r.path.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if any_matched {
        Ok(())
    } else {
        Err(CliError::NoMatch {
            pattern: args.pattern.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(pattern: &str, paths: &[&str]) -> MatchArgs {
        MatchArgs {
            pattern: pattern.into(),
            paths: paths.iter().map(|p| (*p).to_owned()).collect(),
            end: false,
            strict: false,
            sensitive: false,
            anywhere: false,
        }
    }

    #[test]
    fn prefix_matches_by_default() {
        let records = evaluate(&args("/test", &["/test", "/not-test", "/test/deep?x=1"])).unwrap();
        let matched: Vec<bool> = records.iter().map(|r| r.matched).collect();
        assert_eq!(matched, vec![true, false, true]);
    }

    #[test]
    fn params_are_collected_in_order() {
        let records = evaluate(&args("/users/:id/:tab?", &["/users/7/posts"])).unwrap();
        insta::assert_snapshot!(
            serde_json::to_string(&records[0].params).unwrap(),
            @r#"{"id":"7","tab":"posts"}"#
        );
    }

    #[test]
    fn end_flag_requires_full_match() {
        let mut a = args("/test", &["/test/deep"]);
        a.end = true;
        assert!(!evaluate(&a).unwrap()[0].matched);
    }

    #[test]
    fn bad_pattern_is_a_usage_error() {
        let err = evaluate(&args("/users/:", &["/users/1"])).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }
}

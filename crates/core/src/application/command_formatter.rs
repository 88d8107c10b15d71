// Command Formatter - experiment request to positional argument line

use std::collections::HashMap;

use crate::application::constants::UID_ARG_PREFIX;
use crate::domain::{ExperimentRequest, FormattedCommand, Mode};

/// Format `<mode> <target> <action> --k=v ... uid=<id>`
///
/// Flags with an empty value are skipped. Values are not escaped or quoted;
/// flag order follows the map's iteration order.
pub fn format_command(
    mode: Mode,
    target: &str,
    action_name: &str,
    flags: &HashMap<String, String>,
    correlation_id: &str,
) -> FormattedCommand {
    let mut tokens = Vec::with_capacity(flags.len() + 4);
    tokens.push(mode.keyword().to_string());
    tokens.push(target.to_string());
    tokens.push(action_name.to_string());
    tokens.extend(
        flags
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("--{}={}", k, v)),
    );
    tokens.push(format!("{}{}", UID_ARG_PREFIX, correlation_id));
    FormattedCommand::new(tokens)
}

/// Format a whole request
pub fn format_request(request: &ExperimentRequest) -> FormattedCommand {
    format_command(
        request.mode,
        &request.target,
        &request.action_name,
        &request.flags,
        &request.correlation_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_flags_are_omitted() {
        let flags = flags(&[("path", ""), ("size", "1024"), ("reserve", "")]);
        let cmd = format_command(Mode::Create, "disk", "fill", &flags, "u1");

        assert!(cmd.tokens().iter().all(|t| !t.starts_with("--path")));
        assert!(cmd.tokens().iter().all(|t| !t.starts_with("--reserve")));
        assert!(cmd.tokens().contains(&"--size=1024".to_string()));
        assert_eq!(cmd.tokens().len(), 5);
    }

    #[test]
    fn test_mode_prefix() {
        let flags = flags(&[("cpu-count", "2")]);

        let create = format_command(Mode::Create, "cpu", "fullload", &flags, "u2");
        assert_eq!(create.tokens()[0], "create");

        let destroy = format_command(Mode::Destroy, "cpu", "fullload", &flags, "u2");
        assert_eq!(destroy.tokens()[0], "destroy");
    }

    #[test]
    fn test_fixed_positions() {
        let flags = flags(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let cmd = format_command(Mode::Create, "network", "delay", &flags, "abc123");
        let tokens = cmd.tokens();

        assert_eq!(&tokens[..3], &["create", "network", "delay"]);
        assert_eq!(tokens.last().unwrap(), "uid=abc123");
        for expected in ["--a=1", "--b=2", "--c=3"] {
            assert!(tokens.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_no_flags() {
        let cmd = format_command(Mode::Destroy, "process", "kill", &HashMap::new(), "u3");
        assert_eq!(cmd.as_arg_string(), "destroy process kill uid=u3");
    }

    #[test]
    fn test_deterministic_for_same_map() {
        let flags = flags(&[("timeout", "30"), ("process", "nginx"), ("signal", "9")]);

        let first = format_command(Mode::Create, "process", "kill", &flags, "u4");
        let second = format_command(Mode::Create, "process", "kill", &flags, "u4");

        assert_eq!(first.as_arg_string(), second.as_arg_string());
    }

    #[test]
    fn test_values_are_not_escaped() {
        let flags = flags(&[("content", "a b;rm")]);
        let cmd = format_command(Mode::Create, "file", "append", &flags, "u5");

        assert!(cmd.as_arg_string().contains("--content=a b;rm"));
    }

    #[test]
    fn test_format_request_matches_format_command() {
        let req = ExperimentRequest::new("u6", "mem", "load", Mode::Create)
            .with_flag("mem-percent", "50");

        assert_eq!(
            format_request(&req).as_arg_string(),
            "create mem load --mem-percent=50 uid=u6"
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, RunEvent, Severity, SYSTEM_AGENT};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterOptions {
    /// Phase activities are progress banners, not agent actions.
    pub hide_phase_events: bool,
    pub selected_agent_name: Option<String>,
    pub event_types: Option<Vec<EventKind>>,
    pub show_debug: bool,
    pub hide_llm_calls: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            hide_phase_events: true,
            selected_agent_name: None,
            event_types: None,
            show_debug: false,
            hide_llm_calls: false,
        }
    }
}

impl FilterOptions {
    pub fn for_agent(agent: impl Into<String>) -> Self {
        Self {
            selected_agent_name: Some(agent.into()),
            ..Self::default()
        }
    }

    pub fn only_types(types: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            event_types: Some(types.into_iter().collect()),
            ..Self::default()
        }
    }
}

/// Selects the events a view should render, preserving arrival order.
///
/// Stages run in sequence: visibility (debug, LLM calls), phase banners,
/// agent focus, then the type allowlist.
pub fn filter_events_for_display<'a>(
    events: &'a [RunEvent],
    options: &FilterOptions,
) -> Vec<&'a RunEvent> {
    events
        .iter()
        .filter(|e| options.show_debug || e.severity != Severity::Debug)
        .filter(|e| !(options.hide_llm_calls && e.event_type == EventKind::LlmCall))
        .filter(|e| !(options.hide_phase_events && e.is_phase()))
        .filter(|e| match options.selected_agent_name.as_deref() {
            Some(agent) => matches_agent_focus(e, agent),
            None => true,
        })
        .filter(|e| match &options.event_types {
            Some(types) => types.contains(&e.event_type),
            None => true,
        })
        .collect()
}

fn matches_agent_focus(event: &RunEvent, agent: &str) -> bool {
    match event.event_type {
        EventKind::System => true,
        EventKind::Activity => {
            matches!(event.agent(), Some(name) if name == agent || name == SYSTEM_AGENT)
        }
        _ => event.agent() == Some(agent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(id: &str, kind: EventKind, agent: Option<&str>) -> RunEvent {
        RunEvent::new(kind, agent.map(str::to_string), json!({})).with_id(id)
    }

    fn ids(events: &[&RunEvent]) -> Vec<String> {
        events.iter().map(|e| e.event_id.clone()).collect()
    }

    fn phase(id: &str) -> RunEvent {
        RunEvent::new(
            EventKind::Activity,
            Some("System".to_string()),
            json!({"activity_type": "phase", "message": "Gathering data"}),
        )
        .with_id(id)
    }

    fn mixed() -> Vec<RunEvent> {
        vec![
            ev("1", EventKind::ToolCall, Some("A")),
            ev("2", EventKind::ToolCall, Some("B")),
            ev("3", EventKind::Activity, Some("System")),
            ev("4", EventKind::ToolResult, Some("A")),
            ev("5", EventKind::System, None),
            ev("6", EventKind::LlmCall, Some("A")),
            ev("7", EventKind::Activity, Some("B")),
            ev("8", EventKind::TaskOutput, Some("B")),
            ev("9", EventKind::ToolCall, Some("A")).with_severity(Severity::Debug),
            phase("10"),
        ]
    }

    #[test]
    fn test_type_allowlist_keeps_order() {
        let events = mixed();
        let opts = FilterOptions::only_types([EventKind::ToolCall]);
        let out = filter_events_for_display(&events, &opts);
        assert_eq!(ids(&out), vec!["1", "2"]);
        assert!(out.iter().all(|e| e.event_type == EventKind::ToolCall));
    }

    #[test]
    fn test_defaults_hide_debug_and_phase() {
        let events = mixed();
        let out = filter_events_for_display(&events, &FilterOptions::default());
        assert_eq!(ids(&out), vec!["1", "2", "3", "4", "5", "6", "7", "8"]);

        let opts = FilterOptions {
            show_debug: true,
            hide_phase_events: false,
            ..FilterOptions::default()
        };
        assert_eq!(filter_events_for_display(&events, &opts).len(), events.len());
    }

    #[test]
    fn test_agent_focus() {
        let events = mixed();
        let out = filter_events_for_display(&events, &FilterOptions::for_agent("A"));
        assert_eq!(ids(&out), vec!["1", "3", "4", "5", "6"]);
    }

    #[test]
    fn test_agent_focus_binds_llm_calls_and_unknown_kinds() {
        let events = vec![
            ev("1", EventKind::LlmCall, Some("B")),
            ev("2", EventKind::parse("heartbeat"), Some("B")),
            ev("3", EventKind::LlmCall, Some("A")),
            ev("4", EventKind::parse("heartbeat"), Some("A")),
        ];
        let out = filter_events_for_display(&events, &FilterOptions::for_agent("A"));
        assert_eq!(ids(&out), vec!["3", "4"]);
    }

    #[test]
    fn test_combined_modes() {
        let events = mixed();
        let opts = FilterOptions {
            selected_agent_name: Some("A".to_string()),
            event_types: Some(vec![EventKind::ToolCall, EventKind::ToolResult]),
            hide_llm_calls: true,
            ..FilterOptions::default()
        };
        assert_eq!(ids(&filter_events_for_display(&events, &opts)), vec!["1", "4"]);
    }

    #[test]
    fn test_filtering_a_prefix_matches_prefix_of_filtered() {
        let events = mixed();
        let opts = FilterOptions::for_agent("B");
        let full = ids(&filter_events_for_display(&events, &opts));
        for end in 0..=events.len() {
            let partial = ids(&filter_events_for_display(&events[..end], &opts));
            assert_eq!(partial, full[..partial.len()].to_vec());
        }
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: FilterOptions =
            serde_json::from_value(json!({"event_types": ["tool_call"]})).unwrap();
        assert!(opts.hide_phase_events);
        assert_eq!(opts.event_types, Some(vec![EventKind::ToolCall]));
    }
}

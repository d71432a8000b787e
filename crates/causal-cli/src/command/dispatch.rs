use std::io::{self, BufRead as _};

use anyhow::Context;
use causal_engine::{
    action::Action,
    course::{Course, ErrorReport, Response},
};
use tracing::{debug, info};

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DispatchArg {}

pub(crate) fn run(_arg: &DispatchArg) -> anyhow::Result<()> {
    util::init_tracing();

    let mut course = Course::new();
    let mut output = Output::stdout();
    let mut requests = 0;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read request from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        requests += 1;
        let response = respond_line(&mut course, &line);
        output.write_json_line(&response)?;
    }
    info!(requests, "stdin closed");
    Ok(())
}

/// Parses one request line and applies it.
fn respond_line(course: &mut Course, line: &str) -> Response {
    match serde_json::from_str::<Action>(line) {
        Ok(action) => course.respond(&action),
        Err(err) => {
            debug!(%err, "malformed request");
            Response {
                ok: false,
                error: Some(ErrorReport {
                    kind: "invalid_request",
                    message: err.to_string(),
                }),
                view: course.view(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use causal_engine::course::CourseView;

    use super::*;

    #[test]
    fn test_malformed_request_keeps_state() {
        let mut course = Course::new();
        let ok = respond_line(
            &mut course,
            r#"{"action": "enter", "payload": {"lesson": "selection_bias"}}"#,
        );
        assert!(ok.ok);

        let response = respond_line(&mut course, r#"{"action": "fly"}"#);
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().kind, "invalid_request");
        let CourseView::Lesson(view) = response.view else {
            panic!("expected a lesson view");
        };
        assert_eq!(view.step, 1);
    }

    #[test]
    fn test_rejected_action_is_reported() {
        let mut course = Course::new();
        let response = respond_line(&mut course, r#"{"action": "reset"}"#);
        assert!(!response.ok);
        let error = response.error.unwrap();
        assert_eq!(error.kind, "no_active_lesson");
        assert_eq!(error.message, "reset needs an open lesson");
    }
}

use colored::{Color, Colorize};

use crate::script::TestResult;

use super::models::RequestRun;

pub fn print_request_run(run: &RequestRun, preview_bytes: Option<usize>) {
    let response = &run.response;
    println!(
        "{} {} {}",
        run.path().bold(),
        response.request.method.bold(),
        response.request.url.cyan()
    );

    print_script_result("Pre-request", &run.prerequest);

    if let Some(error) = &response.error {
        if response.status_code != 0 {
            println!("{} {}", "Status:".bold(), response.status.red());
        }
        println!(
            "{} {} {}",
            "Error:".bold(),
            error.to_string().red(),
            format!("({:.1} ms)", response.duration_ms()).dimmed()
        );
        return;
    }

    let status_color = if response.status_code >= 400 {
        Color::Red
    } else if response.status_code >= 300 {
        Color::Yellow
    } else {
        Color::Green
    };
    println!(
        "{} {} {}",
        "Status:".bold(),
        response.status.color(status_color),
        format!("({:.1} ms)", response.duration_ms()).dimmed()
    );

    println!("{}", "Response headers".bold());
    for (name, value) in &response.headers {
        println!("  {}: {}", name.cyan(), value.dimmed());
    }

    println!(
        "{} {}",
        "Body:".bold(),
        format!("({} bytes)", response.body.len()).dimmed()
    );
    if let Some(limit) = preview_bytes.filter(|limit| *limit > 0) {
        println!("{}", create_preview(&response.body, limit).dimmed());
    }

    print_script_result("Tests", &run.tests);
}

fn print_script_result(label: &str, result: &TestResult) {
    if result.outcomes.is_empty() && result.errors.is_empty() && result.logs.is_empty() {
        return;
    }

    println!(
        "{} {}",
        format!("{label}:").bold(),
        format!("{}/{} passed", result.passed_count(), result.outcomes.len()).dimmed()
    );
    for line in &result.logs {
        println!("  {} {}", "›".dimmed(), line.dimmed());
    }
    for outcome in &result.outcomes {
        if outcome.passed {
            println!("  {} {}", "✓".green(), outcome.name);
        } else {
            println!(
                "  {} {} {}",
                "✗".red(),
                outcome.name,
                outcome.message.as_deref().unwrap_or_default().red()
            );
        }
    }
    for error in &result.errors {
        println!("  {} {}", "!".red().bold(), error.to_string().red());
    }
}

/// First `limit` bytes of `body`, cut back to a character boundary.
fn create_preview(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{RequestError, ScriptError},
        executor::{ResponseData, SentRequest},
        script::TestOutcome,
    };
    use std::time::Duration;

    fn run(response: ResponseData) -> RequestRun {
        let mut tests = TestResult::default();
        tests.outcomes.push(TestOutcome::pass("ok"));
        tests.outcomes.push(TestOutcome::fail("bad", "expected 1 but got 2"));
        tests.errors.push(ScriptError::Timeout(Duration::from_millis(5)));
        tests.logs.push("hello".to_string());
        RequestRun {
            breadcrumb: vec!["Users".to_string()],
            name: "List".to_string(),
            response,
            prerequest: TestResult::default(),
            tests,
        }
    }

    #[test]
    fn create_preview_respects_char_boundaries() {
        assert_eq!(create_preview("hello", 10), "hello");
        assert_eq!(create_preview("hello", 2), "he");
        assert_eq!(create_preview("héllo", 2), "h");
    }

    #[test]
    fn print_request_run_handles_success() {
        let response = ResponseData {
            status_code: 200,
            status: "200 OK".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: "{\"ok\":true}".to_string(),
            elapsed: Duration::from_millis(12),
            request: SentRequest {
                method: "GET".to_string(),
                url: "https://example.com/users".to_string(),
                ..SentRequest::default()
            },
            error: None,
        };
        print_request_run(&run(response), Some(4));
    }

    #[test]
    fn print_request_run_handles_errors() {
        let response = ResponseData {
            error: Some(RequestError::Transport("connection refused".to_string())),
            ..ResponseData::default()
        };
        print_request_run(&run(response), None);
    }
}

use crate::cpu_stress::{DEFAULT_TARGET_PERCENT, MAX_TARGET_PERCENT, MIN_TARGET_PERCENT};
use crate::flash::FlashMessage;
use crate::routes::StatusReport;

const STYLE: &str = "body{font-family:sans-serif;max-width:40em;margin:2em auto;}\
.success{color:#1b5e20}.warning{color:#e65100}.error{color:#b71c1c}\
table{border-collapse:collapse}td{padding:.2em 1em}";

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

pub fn index() -> String {
    layout(
        "cpu-stress",
        "<h1>cpu-stress</h1>\n<ul>\n\
         <li><a href=\"/welcome\">Welcome</a></li>\n\
         <li><a href=\"/stress-test\">CPU stress test</a></li>\n\
         <li><a href=\"/stress-test/status\">Status (JSON)</a></li>\n</ul>",
    )
}

pub fn welcome() -> String {
    layout(
        "Welcome",
        "<h1>Welcome</h1>\n\
         <p>This service can put synthetic CPU load on the host it runs on.</p>\n\
         <p><a href=\"/stress-test\">Open the stress test controls</a></p>",
    )
}

pub fn stress_test(report: &StatusReport, flash: Option<FlashMessage>) -> String {
    let mut body = String::from("<h1>CPU stress test</h1>\n");

    if let Some(msg) = flash {
        body.push_str(&format!(
            "<p class=\"{}\">{}</p>\n",
            msg.level().as_str(),
            msg
        ));
    }

    let state = if report.is_stressing {
        format!("running at {}%", report.current_target)
    } else {
        "idle".to_string()
    };

    body.push_str(&format!(
        "<table>\n\
         <tr><td>State</td><td>{state}</td></tr>\n\
         <tr><td>Active workers</td><td>{}</td></tr>\n\
         <tr><td>Available processors</td><td>{}</td></tr>\n\
         <tr><td>Max memory</td><td>{} MB</td></tr>\n\
         <tr><td>Free memory</td><td>{} MB</td></tr>\n\
         <tr><td>Process memory</td><td>{} MB</td></tr>\n\
         <tr><td>Instance</td><td>{}</td></tr>\n\
         </table>\n",
        report.active_workers,
        report.available_processors,
        report.max_memory,
        report.free_memory,
        report.total_memory,
        report.instance_id,
    ));

    body.push_str(&format!(
        "<form method=\"post\" action=\"/stress-test/start\">\n\
         <label>Target CPU %\n\
         <input type=\"number\" name=\"targetCpuPercent\" value=\"{DEFAULT_TARGET_PERCENT}\" \
         min=\"{MIN_TARGET_PERCENT}\" max=\"{MAX_TARGET_PERCENT}\"></label>\n\
         <button type=\"submit\">Start</button>\n</form>\n\
         <form method=\"post\" action=\"/stress-test/stop\">\n\
         <button type=\"submit\">Stop</button>\n</form>"
    ));

    layout("CPU stress test", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(is_stressing: bool, current_target: u32) -> StatusReport {
        StatusReport {
            is_stressing,
            current_target,
            available_processors: 4,
            max_memory: 2048,
            free_memory: 1024,
            total_memory: 64,
            active_workers: if is_stressing { 4 } else { 0 },
            instance_id: "test-instance".to_string(),
        }
    }

    #[test]
    fn idle_page_has_both_forms() {
        let html = stress_test(&report(false, 0), None);

        assert!(html.contains("idle"));
        assert!(html.contains("action=\"/stress-test/start\""));
        assert!(html.contains("action=\"/stress-test/stop\""));
        assert!(html.contains("value=\"60\""));
        assert!(html.contains("test-instance"));
    }

    #[test]
    fn running_page_shows_target_and_flash() {
        let html = stress_test(
            &report(true, 75),
            Some(FlashMessage::Started { target: 75 }),
        );

        assert!(html.contains("running at 75%"));
        assert!(html.contains(
            "<p class=\"success\">CPU stress test started successfully with target: 75%</p>"
        ));
    }

    #[test]
    fn warning_flash_uses_warning_class() {
        let html = stress_test(&report(false, 0), Some(FlashMessage::NotRunning));
        assert!(html.contains("<p class=\"warning\">No stress test is currently running.</p>"));
    }

    #[test]
    fn static_pages_link_to_controls() {
        assert!(index().contains("href=\"/stress-test\""));
        assert!(welcome().contains("href=\"/stress-test\""));
    }
}

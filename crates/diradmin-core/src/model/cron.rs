// ── Cron table ──
//
// `CRON_JOBS` answers with one numbered key per job (`000=*/5 * * * * cmd`)
// plus the `MAILTO` and `PATH` environment lines.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// One scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronJob {
    /// Panel-assigned id, used to delete the job.
    pub id: String,
    /// The five time fields, single-space separated.
    pub schedule: String,
    pub command: String,
}

/// An account's crontab as reported by the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CronTable {
    pub jobs: Vec<CronJob>,
    pub mailto: Option<String>,
    pub path: Option<String>,
}

impl CronTable {
    pub(crate) fn from_response(value: &Value) -> Result<Self, CoreError> {
        let mut table = Self::default();
        let Value::Object(map) = value else {
            return Ok(table);
        };

        for (key, entry) in map {
            let text = match entry {
                Value::String(text) => text.as_str(),
                _ => "",
            };
            match key.as_str() {
                "MAILTO" => table.mailto = non_empty(text),
                "PATH" => table.path = non_empty(text),
                id if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
                    table.jobs.push(parse_job(id, text)?);
                }
                _ => {}
            }
        }

        table.jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(table)
    }
}

fn parse_job(id: &str, line: &str) -> Result<CronJob, CoreError> {
    let mut fields = line.split_whitespace();
    let schedule: Vec<&str> = fields.by_ref().take(5).collect();
    let command = fields.collect::<Vec<_>>().join(" ");

    if schedule.len() < 5 || command.is_empty() {
        return Err(CoreError::decode(format!("malformed cron job {id}: {line:?}")));
    }

    Ok(CronJob {
        id: id.to_owned(),
        schedule: schedule.join(" "),
        command,
    })
}

/// Split `"*/5 * * * *"` into minute, hour, day of month, month, day of week.
pub(crate) fn split_schedule(schedule: &str) -> Result<[&str; 5], CoreError> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    <[&str; 5]>::try_from(fields).map_err(|fields| CoreError::ValidationFailed {
        message: format!(
            "cron schedule needs 5 fields, got {}: {schedule:?}",
            fields.len()
        ),
    })
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_jobs_and_environment() {
        let value = json!({
            "001": "0 3 * * * /usr/bin/backup --full",
            "000": "*/5 * * * * php /home/bob/cron.php",
            "MAILTO": "",
            "PATH": "/usr/sbin:/home/bob/bin",
        });

        let table = CronTable::from_response(&value).unwrap();

        assert_eq!(
            table.jobs,
            vec![
                CronJob {
                    id: "000".into(),
                    schedule: "*/5 * * * *".into(),
                    command: "php /home/bob/cron.php".into(),
                },
                CronJob {
                    id: "001".into(),
                    schedule: "0 3 * * *".into(),
                    command: "/usr/bin/backup --full".into(),
                },
            ]
        );
        assert_eq!(table.mailto, None);
        assert_eq!(table.path.as_deref(), Some("/usr/sbin:/home/bob/bin"));
    }

    #[test]
    fn empty_response_is_empty_table() {
        assert_eq!(CronTable::from_response(&json!({})).unwrap(), CronTable::default());
    }

    #[test]
    fn truncated_job_is_rejected() {
        assert!(CronTable::from_response(&json!({"000": "* * *"})).is_err());
    }

    #[test]
    fn schedule_needs_five_fields() {
        assert_eq!(
            split_schedule("*/5 * * * 1").unwrap(),
            ["*/5", "*", "*", "*", "1"]
        );
        assert!(matches!(
            split_schedule("@daily"),
            Err(CoreError::ValidationFailed { .. })
        ));
    }
}

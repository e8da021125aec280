//! Prompt text for summaries and the assistant.

use serde_json::Value;

use crate::analysis::{AnalysisData, EmailReport};

/// Report-writer prompt over a chronological mail transcript.
pub fn transcript_summary_prompt(transcript: &str) -> String {
    format!(
        "You are an expert analyst and an excellent communicator. Your task is to analyze the \
following sequence of emails, given in chronological order, and write a narrative report that \
describes how events, discussions, key decisions and resulting actions evolved. The report \
should read as a coherent flow of what happened.\n\n\
**Report structure and tone:**\n\
- Start with a short overall title that captures the essence of the topic.\n\
- Continue with a fluent, chronological narrative. Instead of rigid headings such as \
'Introduction' or 'Development', weave that information naturally into the text.\n\
- For each important development, say who did or said what, when it happened (if relevant \
and distinctive), and what its impact or key information was.\n\
- Use well-formed paragraphs to separate distinct ideas or stages. Bullet lists are fine for \
enumerating specific actions or points within a development.\n\
- Highlight crucial decisions, problems that came up, solutions proposed or implemented, and \
any action still pending at the end of the sequence.\n\
- Keep the language professional, clear and precise, with careful grammar and spelling.\n\
- Someone who did not read the emails should quickly understand what happened, how the \
situation evolved and where it stands now.\n\
- Where it helps, use light Markdown for emphasis (**bold** for project names or important \
decisions, *italics* for short quotes or specific terms) and for lists.\n\n\
**Content to extract and present:**\n\
- The main topic or project.\n\
- The key participants and their roles (if they can be inferred).\n\
- The sequence of events and communications.\n\
- Problems identified and how they were handled.\n\
- Decisions taken.\n\
- Outcome or current status.\n\
- Any pending task or action.\n\n\
Analyze the following sequence of emails:\n\n\
{transcript}\n\n\
---\n**Detailed Chronological Report:**"
    )
}

/// Executive-summary prompt over a sheet's headers, labels and data rows.
pub fn sheet_summary_prompt(headers: &[String], labels: &[String], rows: &[Vec<String>]) -> String {
    format!(
        "Analyze the following data and write a brief executive summary:\n\n\
Headers: {headers:?}\n\
Labels: {labels:?}\n\
Values: {rows:?}\n\n\
The summary should include:\n\
1. Main trends observed\n\
2. Maximum and minimum values\n\
3. Any relevant insight from the data\n\
4. Recommendations based on the analysis\n\n\
Use Markdown to structure your answer."
    )
}

/// A user question about one analysis, with prior conversation turns.
pub struct AssistantPrompt<'a> {
    pub query: &'a str,
    pub context: &'a [Value],
    pub analysis: &'a AnalysisData,
}

impl AssistantPrompt<'_> {
    pub fn render(&self) -> String {
        let history = render_history(self.context);
        match self.analysis {
            AnalysisData::EmailReport(report) => self.email_report_prompt(report, &history),
            AnalysisData::SheetAnalysis(_) | AnalysisData::FailureAnalysis(_) => {
                self.data_prompt(&history)
            }
        }
    }

    fn email_report_prompt(&self, report: &EmailReport, history: &str) -> String {
        let subject = non_empty_or(&report.subject, "Not specified");
        let content = non_empty_or(&report.content, "Report not available");
        format!(
            "You are an analytical assistant specialized in email summaries.\n\
You have been given the following report, generated from an email thread with subject: \"{subject}\".\n\n\
The report reads:\n\n\
```\n{content}\n```\n\n\
CONVERSATION HISTORY:\n{history}\n\n\
USER QUESTION: {query}\n\n\
Answer the user's question based on the report.\n\
- Be specific and use concrete information from the report\n\
- If asked about something that is not in the report, say so clearly\n\
- Use Markdown to format the answer when useful\n\n\
Your answer:",
            query = self.query
        )
    }

    fn data_prompt(&self, history: &str) -> String {
        let (description, data) = match self.analysis {
            AnalysisData::FailureAnalysis(analysis) => (
                "technical failure data",
                serde_json::to_string_pretty(analysis),
            ),
            AnalysisData::SheetAnalysis(chart) => {
                ("spreadsheet data", serde_json::to_string_pretty(chart))
            }
            AnalysisData::EmailReport(report) => ("report data", serde_json::to_string_pretty(report)),
        };
        let data = data.unwrap_or_else(|e| format!("<unavailable: {e}>"));

        let coverage = match self.analysis {
            AnalysisData::FailureAnalysis(_) => {
                "These data contain:\n\
- The 5 families with the most failures (TrackID count)\n\
- The 5 most frequent TestCodes\n\
- The 5 processes with the most failures\n\
- Detailed TestCode information for each main family\n\n"
            }
            _ => "",
        };

        format!(
            "You are an analytical assistant specialized in {description}. You have been given the \
following analysis data:\n\n\
```json\n{data}\n```\n\n\
{coverage}\
CONVERSATION HISTORY:\n{history}\n\n\
USER QUESTION: {query}\n\n\
Answer the user's question clearly and concisely using the data provided.\n\
- Mention specific numbers and percentages when relevant\n\
- If asked about data that is not available, say so clearly\n\
- Keep a conversational but professional tone\n\
- Use Markdown to format the answer when useful (bold, lists, etc.)\n\
- If a requested analysis needs data you do not have, suggest what additional information would help\n\n\
Your answer:",
            query = self.query
        )
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// One line per turn. Strings pass through; `{role, content}` objects render
/// as `role: content`; anything else as compact JSON.
fn render_history(context: &[Value]) -> String {
    if context.is_empty() {
        return "(none)".to_string();
    }
    context
        .iter()
        .map(|turn| match turn {
            Value::String(text) => text.clone(),
            Value::Object(map) => match (
                map.get("role").and_then(Value::as_str),
                map.get("content").and_then(Value::as_str),
            ) {
                (Some(role), Some(content)) => format!("{role}: {content}"),
                _ => turn.to_string(),
            },
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analysis::{ChartAnalysis, FailureAnalysis};

    #[test]
    fn transcript_prompt_embeds_transcript() {
        let prompt = transcript_summary_prompt("DATE: N/A\nBODY:\nhello");
        assert!(prompt.contains("DATE: N/A\nBODY:\nhello"));
        assert!(prompt.ends_with("**Detailed Chronological Report:**"));
    }

    #[test]
    fn sheet_prompt_lists_inputs() {
        let prompt = sheet_summary_prompt(
            &["Sales".to_string()],
            &["Jan".to_string()],
            &[vec!["Jan".to_string(), "10".to_string()]],
        );
        assert!(prompt.contains(r#"Headers: ["Sales"]"#));
        assert!(prompt.contains(r#"Values: [["Jan", "10"]]"#));
    }

    #[test]
    fn email_report_dispatch() {
        let analysis = AnalysisData::EmailReport(EmailReport {
            subject: "Invoice".into(),
            content: "Paid on Friday.".into(),
        });
        let context = [json!("user: hi"), json!({"role": "assistant", "content": "hello"})];
        let prompt = AssistantPrompt {
            query: "When was it paid?",
            context: &context,
            analysis: &analysis,
        }
        .render();
        assert!(prompt.contains("specialized in email summaries"));
        assert!(prompt.contains("subject: \"Invoice\""));
        assert!(prompt.contains("Paid on Friday."));
        assert!(prompt.contains("user: hi\nassistant: hello"));
        assert!(prompt.contains("USER QUESTION: When was it paid?"));
        assert!(!prompt.contains("```json"));
    }

    #[test]
    fn empty_report_fields_get_placeholders() {
        let analysis = AnalysisData::EmailReport(EmailReport::default());
        let prompt = AssistantPrompt {
            query: "q",
            context: &[],
            analysis: &analysis,
        }
        .render();
        assert!(prompt.contains("\"Not specified\""));
        assert!(prompt.contains("Report not available"));
        assert!(prompt.contains("CONVERSATION HISTORY:\n(none)"));
    }

    #[test]
    fn failure_analysis_dispatch_embeds_json() {
        let analysis = AnalysisData::FailureAnalysis(FailureAnalysis {
            total_records: 12,
            ..Default::default()
        });
        let prompt = AssistantPrompt {
            query: "Which family fails most?",
            context: &[],
            analysis: &analysis,
        }
        .render();
        assert!(prompt.contains("technical failure data"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"totalRecords\": 12"));
        assert!(prompt.contains("The 5 most frequent TestCodes"));
    }

    #[test]
    fn sheet_analysis_dispatch_uses_data_prompt() {
        let analysis = AnalysisData::SheetAnalysis(ChartAnalysis {
            title: "Analysis of A1:B3".into(),
            ..Default::default()
        });
        let prompt = AssistantPrompt {
            query: "Trend?",
            context: &[json!(42)],
            analysis: &analysis,
        }
        .render();
        assert!(prompt.contains("spreadsheet data"));
        assert!(prompt.contains("Analysis of A1:B3"));
        assert!(!prompt.contains("TrackID count"));
        assert!(prompt.contains("CONVERSATION HISTORY:\n42"));
    }
}

// 🧾 Receipt generator
//
// Renders a generic payload (title, subtitle, label/value fields, total,
// metadata) as a single printable HTML page:
//
//   header badge → title → subtitle → metadata line
//   → two-column field grid → highlighted total → footer disclaimer
//
// Output is either saved to a file, or handed to a print spooler. A blocked
// spooler falls back to saving.

use crate::currency::format_currency;
use crate::entities::Contribution;
use chrono::NaiveDate;
use minijinja::{context, AutoEscape, Environment};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{info, warn};

const TEMPLATE_NAME: &str = "receipt.html";
const TEMPLATE: &str = include_str!("../templates/receipt.html");

const BADGE: &str = "OFFICIAL RECEIPT";
const DISCLAIMER: &str =
    "This is a computer generated receipt and does not require a signature. \
     Please retain it for your records.";

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("failed to write receipt: {0}")]
    Io(#[from] std::io::Error),
    #[error("printing failed: {0}")]
    Print(String),
    #[error("failed to render receipt: {0}")]
    Template(#[from] minijinja::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    /// The print window could not be opened (no spooler, popup blocked)
    Blocked(String),
    Failed(String),
}

// ============================================================================
// PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptField {
    pub label: String,
    pub value: String,
}

impl ReceiptField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        ReceiptField {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    pub issued_on: NaiveDate,
    pub issued_by: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub title: String,
    pub subtitle: String,
    pub fields: Vec<ReceiptField>,

    /// Any money input; normalized when rendered
    pub total: String,

    pub metadata: ReceiptMetadata,
}

impl ReceiptPayload {
    /// Receipt for a single contribution
    pub fn for_contribution(contribution: &Contribution, contributor: &str, issued_by: &str) -> Self {
        ReceiptPayload {
            title: "Contribution Receipt".to_string(),
            subtitle: format!("Received with thanks from {}", contributor),
            fields: vec![
                ReceiptField::new("Contributor", contributor),
                ReceiptField::new("Contributor Type", capitalize(contribution.owner.kind())),
                ReceiptField::new("Purpose", if contribution.purpose.is_empty() { "General" } else { contribution.purpose.as_str() }),
                ReceiptField::new("Date", contribution.date.format("%d %b %Y").to_string()),
                ReceiptField::new("Amount", contribution.display_amount()),
                ReceiptField::new("Contribution No.", contribution.id.to_string()),
            ],
            total: contribution.amount.to_string(),
            metadata: ReceiptMetadata {
                issued_on: contribution.date,
                issued_by: issued_by.to_string(),
                reference: Some(contribution.owner.to_string()),
            },
        }
    }

    /// Stable receipt number: first 10 hex chars of SHA-256 over the content
    pub fn receipt_number(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        for field in &self.fields {
            hasher.update(field.label.as_bytes());
            hasher.update(b"=");
            hasher.update(field.value.as_bytes());
            hasher.update(b";");
        }
        hasher.update(format_currency(&self.total).as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..10].to_uppercase()
    }

    pub fn file_name(&self) -> String {
        format!("receipt-{}.html", self.receipt_number())
    }

    /// Render through the HTML template; every payload value is escaped
    pub fn render_html(&self) -> Result<String, ReceiptError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;

        // Two label/value pairs per row, the last one padded
        let rows: Vec<Vec<ReceiptField>> = self
            .fields
            .chunks(2)
            .map(|pair| {
                let mut row = pair.to_vec();
                if row.len() == 1 {
                    row.push(ReceiptField::new("", ""));
                }
                row
            })
            .collect();

        let html = env.get_template(TEMPLATE_NAME)?.render(context! {
            badge => BADGE,
            title => &self.title,
            subtitle => &self.subtitle,
            number => self.receipt_number(),
            issued_on => self.metadata.issued_on.format("%d %b %Y").to_string(),
            issued_by => &self.metadata.issued_by,
            reference => &self.metadata.reference,
            rows => rows,
            total => format_currency(&self.total),
            disclaimer => DISCLAIMER,
        })?;
        Ok(html)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Something that can open a document for printing
pub trait PrintSpooler {
    fn open(&self, document: &str) -> Result<(), PrintError>;
}

/// Pipes the document into a system print command (`lp` by default)
pub struct CommandSpooler {
    program: String,
}

impl CommandSpooler {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpooler { program: program.into() }
    }
}

impl Default for CommandSpooler {
    fn default() -> Self {
        CommandSpooler::new("lp")
    }
}

impl PrintSpooler for CommandSpooler {
    fn open(&self, document: &str) -> Result<(), PrintError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| PrintError::Blocked(format!("{}: {}", self.program, e)))?;

        // Dropping stdin closes the pipe so the spooler sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(document.as_bytes()),
            None => Ok(()),
        };
        if let Err(e) = written {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PrintError::Failed(e.to_string()));
        }

        let status = child.wait().map_err(|e| PrintError::Failed(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(PrintError::Failed(format!("{} exited with {}", self.program, status)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutput {
    Save(PathBuf),
    Print,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Saved(PathBuf),
    Printed,
    /// Printing was blocked; the receipt was saved instead
    SavedFallback(PathBuf),
}

pub struct ReceiptWriter<S> {
    spooler: S,
    output_dir: PathBuf,
}

impl<S: PrintSpooler> ReceiptWriter<S> {
    pub fn new(spooler: S, output_dir: impl Into<PathBuf>) -> Self {
        ReceiptWriter {
            spooler,
            output_dir: output_dir.into(),
        }
    }

    pub fn deliver(&self, payload: &ReceiptPayload, output: ReceiptOutput) -> Result<Delivered, ReceiptError> {
        let document = payload.render_html()?;

        match output {
            ReceiptOutput::Save(path) => {
                save(&path, &document)?;
                Ok(Delivered::Saved(path))
            }
            ReceiptOutput::Print => match self.spooler.open(&document) {
                Ok(()) => {
                    info!(receipt = %payload.receipt_number(), "sent to printer");
                    Ok(Delivered::Printed)
                }
                Err(PrintError::Blocked(reason)) => {
                    warn!(%reason, "print blocked, saving instead");
                    let path = self.output_dir.join(payload.file_name());
                    save(&path, &document)?;
                    Ok(Delivered::SavedFallback(path))
                }
                Err(PrintError::Failed(reason)) => Err(ReceiptError::Print(reason)),
            },
        }
    }
}

fn save(path: &Path, document: &str) -> Result<(), ReceiptError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, document)?;
    info!(path = %path.display(), "receipt saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContributionOwner, NewContribution};
    use std::cell::RefCell;

    fn payload() -> ReceiptPayload {
        ReceiptPayload {
            title: "Feast Contribution".to_string(),
            subtitle: "St Mary's <Kudamaloor>".to_string(),
            fields: vec![
                ReceiptField::new("Family", "Kallarackal"),
                ReceiptField::new("Community", "St Joseph Unit"),
                ReceiptField::new("Purpose", "Feast"),
            ],
            total: "Rs. 50,000".to_string(),
            metadata: ReceiptMetadata {
                issued_on: NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(),
                issued_by: "Parish Office".to_string(),
                reference: None,
            },
        }
    }

    struct BlockedSpooler;

    impl PrintSpooler for BlockedSpooler {
        fn open(&self, _document: &str) -> Result<(), PrintError> {
            Err(PrintError::Blocked("popup blocked".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSpooler {
        printed: RefCell<Vec<String>>,
    }

    impl PrintSpooler for RecordingSpooler {
        fn open(&self, document: &str) -> Result<(), PrintError> {
            self.printed.borrow_mut().push(document.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_render_sections_in_order() {
        let html = payload().render_html().unwrap();

        let order = [BADGE, "Feast Contribution", "&lt;Kudamaloor&gt;", "Receipt No.", "<table>", "Rs. 50,000.00", DISCLAIMER];
        let mut last = 0;
        for needle in order {
            let at = html[last..].find(needle).unwrap_or_else(|| panic!("missing {}", needle));
            last += at;
        }
    }

    #[test]
    fn test_payload_values_are_escaped() {
        let mut payload = payload();
        payload.fields.push(ReceiptField::new("Note", "<script>alert(1)</script>"));
        let html = payload.render_html().unwrap();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<Kudamaloor>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_odd_field_count_pads_grid() {
        let html = payload().render_html().unwrap();
        assert_eq!(html.matches("<tr>").count(), 2);
        assert!(html.contains("<th>Purpose</th><td>Feast</td><th></th><td></td>"));
    }

    #[test]
    fn test_receipt_number_is_stable() {
        let a = payload();
        let mut b = payload();
        assert_eq!(a.receipt_number(), b.receipt_number());
        assert_eq!(a.receipt_number().len(), 10);

        b.total = "Rs. 50,001".to_string();
        assert_ne!(a.receipt_number(), b.receipt_number());
    }

    #[test]
    fn test_for_contribution() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let contribution = Contribution::new(
            7,
            NewContribution::new(ContributionOwner::Family(3), 75250.5, "").on(date),
        );
        let payload = ReceiptPayload::for_contribution(&contribution, "Kallarackal", "Parish Office");

        assert_eq!(payload.fields[1].value, "Family");
        assert_eq!(payload.fields[2].value, "General");
        assert_eq!(payload.fields[4].value, "Rs. 75,250.50");
        assert_eq!(payload.metadata.reference.as_deref(), Some("family:3"));
        assert!(payload.render_html().unwrap().contains("Total: <strong>Rs. 75,250.50</strong>"));
    }

    #[test]
    fn test_save_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("r.html");
        let writer = ReceiptWriter::new(BlockedSpooler, dir.path());

        let delivered = writer.deliver(&payload(), ReceiptOutput::Save(path.clone())).unwrap();
        assert_eq!(delivered, Delivered::Saved(path.clone()));
        assert!(std::fs::read_to_string(&path).unwrap().contains(BADGE));
    }

    #[test]
    fn test_print_mode() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReceiptWriter::new(RecordingSpooler::default(), dir.path());

        let delivered = writer.deliver(&payload(), ReceiptOutput::Print).unwrap();
        assert_eq!(delivered, Delivered::Printed);
        assert_eq!(writer.spooler.printed.borrow().len(), 1);
    }

    #[test]
    fn test_blocked_print_falls_back_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReceiptWriter::new(BlockedSpooler, dir.path());

        let delivered = writer.deliver(&payload(), ReceiptOutput::Print).unwrap();
        let expected = dir.path().join(payload().file_name());
        assert_eq!(delivered, Delivered::SavedFallback(expected.clone()));
        assert!(expected.exists());
    }

    #[test]
    fn test_missing_print_command_is_blocked() {
        let spooler = CommandSpooler::new("definitely-not-a-print-command");
        let err = spooler.open("<html></html>").unwrap_err();
        assert!(matches!(err, PrintError::Blocked(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_spooler_that_ignores_input_fails() {
        // `true` exits without reading, so a document larger than the pipe buffer cannot be written
        let spooler = CommandSpooler::new("true");
        let err = spooler.open(&"x".repeat(1 << 20)).unwrap_err();
        assert!(matches!(err, PrintError::Failed(_)));
    }
}

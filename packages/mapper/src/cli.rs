//! Command-line interface for the mapper.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use tracing::debug;

use crate::config::DEFAULT_XML_VERSION;
use crate::error::Result;
use crate::writer::FormattingWriter;
use crate::xml::{Attribute, EventKind, TagName, XmlCursor, XmlEmitter, XmlReader, XmlWriter};

/// XML Mapper - stream XML documents through the formatting writer.
#[derive(Parser)]
#[command(name = "xml-mapper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-indent an XML document.
    Format {
        /// Input XML file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an XML declaration even if the input has none
        #[arg(long)]
        declaration: bool,
    },
}

/// Counts reported after formatting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormatSummary {
    pub elements: usize,
    pub attributes: usize,
    pub max_depth: usize,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Format {
            input,
            output,
            declaration,
        } => format_command(&input, output.as_deref(), declaration),
    }
}

/// Execute the format command.
fn format_command(input: &Path, output: Option<&Path>, declaration: bool) -> Result<()> {
    let file = File::open(input)?;
    let cursor = XmlReader::new(BufReader::new(file));

    match output {
        Some(path) => {
            let mut emitter = XmlWriter::new(BufWriter::new(File::create(path)?));
            let summary = reformat(cursor, &mut emitter, declaration)?;
            eprintln!(
                "{} {} {}",
                style("Formatted").bold(),
                style(input.display()).cyan(),
                style(format!("-> {}", path.display())).green()
            );
            eprintln!("  Elements: {}", summary.elements);
            eprintln!("  Attributes: {}", summary.attributes);
            eprintln!("  Max depth: {}", summary.max_depth);
        }
        None => {
            let mut emitter = XmlWriter::new(io::stdout().lock());
            reformat(cursor, &mut emitter, declaration)?;
            let mut stdout = emitter.into_inner();
            writeln!(stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Replay every event of `cursor` into a [`FormattingWriter`] over `emitter`.
///
/// Whitespace-only text is dropped so the output is indented afresh. With
/// `always_declare`, a document without XML declaration gets one for
/// [`DEFAULT_XML_VERSION`]. The cursor and the emitter are closed on success.
///
/// # Errors
/// Any error of the cursor or the emitter.
pub fn reformat<C, E>(mut cursor: C, emitter: &mut E, always_declare: bool) -> Result<FormatSummary>
where
    C: XmlCursor,
    E: XmlEmitter,
{
    let mut summary = FormatSummary::default();
    let mut depth = 0;
    let mut declared = false;
    let mut writer = FormattingWriter::new(&mut *emitter);

    loop {
        let kind = cursor.next()?;
        if !declared {
            match cursor.version() {
                Some(version) => writer.write_start_document(version, cursor.encoding())?,
                None if always_declare => writer.write_start_document(DEFAULT_XML_VERSION, None)?,
                None => {}
            }
            declared = true;
        }
        match kind {
            EventKind::StartDocument => {}
            EventKind::StartElement => {
                writer.write_start_element(&element_tag(&cursor))?;
                for binding in cursor.namespaces() {
                    match binding.prefix() {
                        Some(prefix) => writer.write_namespace(prefix, binding.uri())?,
                        None => writer.write_default_namespace(binding.uri())?,
                    }
                }
                for attribute in cursor.attributes() {
                    writer.write_attribute(&attribute_tag(attribute), attribute.value())?;
                }
                summary.elements += 1;
                summary.attributes += cursor.attributes().len();
                depth += 1;
                summary.max_depth = summary.max_depth.max(depth);
            }
            EventKind::EndElement => {
                writer.write_end_element()?;
                depth -= 1;
            }
            EventKind::Characters => {
                if !cursor.is_whitespace() {
                    writer.write_characters(cursor.text().unwrap_or_default())?;
                }
            }
            EventKind::CData => writer.write_cdata(cursor.text().unwrap_or_default())?,
            EventKind::Comment => {
                writer.write_comment(&normalize_comment(cursor.text().unwrap_or_default()))?;
            }
            EventKind::ProcessingInstruction => writer.write_processing_instruction(
                cursor.pi_target().unwrap_or_default(),
                cursor.pi_data(),
            )?,
            EventKind::Dtd => writer.write_dtd(cursor.text().unwrap_or_default())?,
            EventKind::EndDocument => {
                writer.write_end_document()?;
                break;
            }
        }
    }

    writer.close()?;
    cursor.close()?;
    debug!(elements = summary.elements, depth = summary.max_depth, "Reformatted document");
    Ok(summary)
}

fn element_tag(cursor: &impl XmlCursor) -> TagName {
    let Some(name) = cursor.name() else {
        return TagName::local("");
    };
    qualified_tag(name.namespace(), cursor.prefix(), name.local_name())
}

fn attribute_tag(attribute: &Attribute) -> TagName {
    let name = attribute.name();
    qualified_tag(name.namespace(), attribute.prefix(), name.local_name())
}

fn qualified_tag(namespace: Option<&str>, prefix: Option<&str>, local_name: &str) -> TagName {
    match (namespace, prefix) {
        (Some(ns), Some(prefix)) => TagName::prefixed(prefix, ns, local_name),
        (Some(ns), None) => TagName::namespaced(ns, local_name),
        (None, _) => TagName::local(local_name),
    }
}

/// Strip the layout a previous run added so comments are stable across runs.
fn normalize_comment(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('~').map_or(line, str::trim_start)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formatted(input: &str) -> (String, FormatSummary) {
        let mut emitter = XmlWriter::new(Vec::new());
        let summary = reformat(XmlReader::from_text(input), &mut emitter, false).unwrap();
        (String::from_utf8(emitter.into_inner()).unwrap(), summary)
    }

    #[test]
    fn test_cli_parse_format() {
        let cli = Cli::parse_from(["xml-mapper", "format", "in.xml"]);

        let Commands::Format {
            input,
            output,
            declaration,
        } = cli.command;
        assert_eq!(input, PathBuf::from("in.xml"));
        assert!(output.is_none());
        assert!(!declaration);
    }

    #[test]
    fn test_cli_parse_format_with_output() {
        let cli = Cli::parse_from(["xml-mapper", "format", "in.xml", "-o", "out.xml"]);

        let Commands::Format { output, .. } = cli.command;
        assert_eq!(output, Some(PathBuf::from("out.xml")));
    }

    #[test]
    fn test_reformat_indents_and_collapses() {
        let (out, summary) = formatted(r#"<a><b x="1"></b><c>text</c></a>"#);
        assert_eq!(out, "<a>\n    <b x=\"1\"/>\n    <c>text</c>\n</a>");
        assert_eq!(
            summary,
            FormatSummary {
                elements: 3,
                attributes: 1,
                max_depth: 2
            }
        );
    }

    #[test]
    fn test_reformat_keeps_declaration_and_namespaces() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<root xmlns="urn:t" xmlns:p="urn:p">
  <p:item p:id="7" xml:lang="nl"/>
</root>"#;
        let (out, _) = formatted(input);
        assert_eq!(
            out,
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<root xmlns=\"urn:t\" xmlns:p=\"urn:p\">\n",
                "    <p:item p:id=\"7\" xml:lang=\"nl\"/>\n",
                "</root>"
            )
        );
    }

    #[test]
    fn test_reformat_adds_declaration_on_request() {
        let mut emitter = XmlWriter::new(Vec::new());
        reformat(XmlReader::from_text("<a/>"), &mut emitter, true).unwrap();
        assert_eq!(
            String::from_utf8(emitter.into_inner()).unwrap(),
            "<?xml version=\"1.0\"?>\n<a/>"
        );
    }

    #[test]
    fn test_reformat_is_stable() {
        let input = "<a><!-- one\n two --><b/></a>";
        let (first, _) = formatted(input);
        let (second, _) = formatted(&first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment(" note "), "note");
        assert_eq!(normalize_comment("\n  ~ one\n  ~ two\n  "), "one\ntwo");
    }
}

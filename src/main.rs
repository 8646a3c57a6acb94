use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Decodes Android binary XML into readable text.
///
/// The input may be a binary AXML document, an APK archive (the
/// AndroidManifest.xml entry is extracted), or a plain textual XML file,
/// which passes through with normalized formatting.
#[derive(Parser, Debug)]
#[command(name = "axmldec", version, about)]
struct Cli {
    /// Input file: binary or textual XML, or an APK archive
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let tree = axmldec::decode_file(&cli.input)?;
    let xml = axmldec::text_xml::write_document(&tree)?;
    match &cli.output {
        Some(path) => fs::write(path, xml)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(xml.as_bytes())?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}

//! Sheetpipe CLI - spreadsheet to CSV conversion tool

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetpipe")]
#[command(
    author,
    version,
    about = "Convert the first worksheet of an XLSX or XLS workbook to CSV"
)]
struct Cli {
    /// Input workbook file, or '-' to read from stdin
    input: PathBuf,

    /// Output CSV file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            let rows = convert(&cli.input, BufWriter::new(file))?;
            eprintln!("Wrote {} rows to {}", rows, path.display());
        }
        None => {
            let stdout = io::stdout();
            let rows = convert(&cli.input, BufWriter::new(stdout.lock()))?;
            eprintln!("Wrote {rows} rows");
        }
    }
    Ok(())
}

fn convert<W: Write>(input: &PathBuf, out: W) -> Result<u64> {
    let mut counter = RowCountingWriter::new(out);

    if input.as_os_str() == "-" {
        // Both container formats need random access; spill stdin to a
        // temporary file first
        let mut spill = tempfile::tempfile().context("Failed to create temporary file")?;
        io::copy(&mut io::stdin().lock(), &mut spill).context("Failed to read stdin")?;
        spill.seek(SeekFrom::Start(0))?;
        sheetpipe::convert_to_csv(spill, &mut counter).context("Conversion failed")?;
    } else {
        sheetpipe::convert_file(input, &mut counter)
            .with_context(|| format!("Failed to convert '{}'", input.display()))?;
    }

    counter.flush()?;
    Ok(counter.rows())
}

/// Write adapter that counts finished CSV rows (newlines) as they pass
/// through.
struct RowCountingWriter<W: Write> {
    inner: W,
    rows: u64,
}

impl<W: Write> RowCountingWriter<W> {
    fn new(inner: W) -> Self {
        RowCountingWriter { inner, rows: 0 }
    }

    fn rows(&self) -> u64 {
        self.rows
    }
}

impl<W: Write> Write for RowCountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.rows += buf[..written].iter().filter(|&&b| b == b'\n').count() as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

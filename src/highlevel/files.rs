//! Address list files.
//!
//! Input files hold one address per line, either IPv6 text or 32 hex
//! digits. Blank lines and lines starting with `#` are skipped. Output
//! files are always 32 lowercase hex digits per line.

use crate::error::{GenError, Result};
use crate::kernel::nybble;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::Ipv6Addr;
use std::path::Path;
use tracing::info;

/// Read every address in `path`.
///
/// A malformed line fails the whole read with its line number.
pub fn read_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<Ipv6Addr>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let addr = nybble::parse_address(text).map_err(|e| {
            GenError::InvalidInput(format!("{}:{}: {e}", path.display(), number + 1))
        })?;
        out.push(addr);
    }
    info!(path = %path.display(), count = out.len(), "read addresses");
    Ok(out)
}

/// Write `addrs` to `path` in hex form, replacing any existing file.
pub fn write_hex_file<P: AsRef<Path>>(path: P, addrs: &[Ipv6Addr]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for addr in addrs {
        writeln!(writer, "{}", nybble::to_hex(addr))?;
    }
    writer.flush()?;
    info!(path = %path.display(), count = addrs.len(), "wrote addresses");
    Ok(())
}

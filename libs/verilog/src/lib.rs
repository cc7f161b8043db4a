//! Structural Verilog netlist exporter for CIR libraries.
//!
//! Every [`Module`](cir::Module) of a library becomes one `module ... endmodule`
//! block, and every instance becomes a named-connection instantiation.
//! External modules are instantiated by name but never defined.
//!
//! ```
//! use cir::{Direction, Library, Module, Port, Signal};
//!
//! let mut lib = Library::new("example");
//! let mut inv = Module::new("cells.inv");
//! inv.add_port(Port::new(Signal::wire("a"), Direction::Input));
//! inv.add_port(Port::new(Signal::wire("y"), Direction::Output));
//! lib.add_module(inv);
//!
//! let mut out = Vec::new();
//! verilog::export_verilog(&lib, &mut out).unwrap();
//! let text = String::from_utf8(out).unwrap();
//! assert!(text.contains("module inv"));
//! ```
#![warn(missing_docs)]

use std::io::Write;
use std::path::Path;

use cir::netlist::{NetlistConversion, Netlister, Writer};
use cir::Library;
use serde::{Deserialize, Serialize};

pub mod format;
pub mod netlist;

pub use cir::{Error, Result};

use crate::netlist::NetlisterInstance;

#[cfg(test)]
mod tests;

/// Configuration for Verilog netlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistOptions {
    /// The text of one indentation level.
    pub indent: String,
    /// Whether to begin the netlist with a comment header naming the library.
    pub prelude: bool,
    /// Whether parameter declarations include a datatype.
    pub param_types: bool,
}

impl Default for NetlistOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            prelude: true,
            param_types: false,
        }
    }
}

impl NetlistOptions {
    /// Creates a new [`NetlistOptions`] with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text of one indentation level.
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Sets whether to write the comment header.
    pub fn prelude(mut self, prelude: bool) -> Self {
        self.prelude = prelude;
        self
    }

    /// Sets whether parameter declarations include a datatype.
    pub fn param_types(mut self, param_types: bool) -> Self {
        self.param_types = param_types;
        self
    }
}

/// The Verilog netlister.
#[derive(Debug, Copy, Clone, Default)]
pub struct Verilog;

impl Netlister for Verilog {
    type Options<'a> = &'a NetlistOptions;

    fn netlist(&self, lib: &Library, opts: Self::Options<'_>) -> Result<Writer> {
        NetlisterInstance::new(lib, opts).export()
    }
}

/// Netlists `lib` to a string using the given options.
pub fn netlist_to_string(lib: &Library, opts: &NetlistOptions) -> Result<String> {
    let (text, _) = Verilog.netlist(lib, opts)?.finish();
    Ok(text)
}

/// Writes a Verilog netlist of `lib` with default options to the given output stream.
pub fn export_verilog<W: Write>(lib: &Library, out: &mut W) -> Result<NetlistConversion> {
    Verilog.write_netlist(lib, out, &NetlistOptions::default())
}

/// Writes a Verilog netlist of `lib` with default options to the file at `path`.
pub fn export_verilog_to_file(
    lib: &Library,
    path: impl AsRef<Path>,
) -> Result<NetlistConversion> {
    Verilog.write_netlist_to_file(lib, path, &NetlistOptions::default())
}

//! Shared infrastructure for writing netlisters for CIR libraries.
//!
//! A netlister walks the modules of a [`Library`] and feeds lines of text to a
//! [`Writer`], resolving each instance's [`Reference`] through a [`Resolver`].
//! Both are scoped to a single emission pass: create fresh ones for every
//! netlist you write.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use arcstr::ArcStr;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{ExternalModule, ExternalModuleId, Library, Module, ModuleId, Port, Reference};

/// A netlister that writes CIR libraries in a particular output format.
pub trait Netlister {
    /// The netlist options type.
    ///
    /// Many netlisters accept options, allowing the user to configure things like
    /// netlist indentation or header comments. This is the type of the object
    /// that stores those options.
    type Options<'a>;

    /// Netlists a CIR library into a fresh [`Writer`].
    ///
    /// Each call is an independent emission pass.
    fn netlist(&self, lib: &Library, opts: Self::Options<'_>) -> Result<Writer>;

    /// Writes a netlist of a CIR library to the provided output stream.
    ///
    /// Nothing is written to `out` unless the entire library is netlisted successfully.
    fn write_netlist<W: Write>(
        &self,
        lib: &Library,
        out: &mut W,
        opts: Self::Options<'_>,
    ) -> Result<NetlistConversion> {
        let writer = self.netlist(lib, opts)?;
        writer.flush_to(out)?;
        Ok(writer.finish().1)
    }

    /// Writes a netlist of a CIR library to a file at the given path.
    ///
    /// The file and any parent directories will be created if necessary,
    /// but only once the entire library has been netlisted successfully.
    fn write_netlist_to_file(
        &self,
        lib: &Library,
        path: impl AsRef<Path>,
        opts: Self::Options<'_>,
    ) -> Result<NetlistConversion> {
        let writer = self.netlist(lib, opts)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut f = std::fs::File::create(path)?;
        writer.flush_to(&mut f)?;
        Ok(writer.finish().1)
    }
}

/// Data describing how CIR modules were named in an output netlist.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NetlistConversion {
    /// The canonical name of each emitted module, in emission order.
    pub modules: IndexMap<ModuleId, ArcStr>,
}

impl NetlistConversion {
    /// Creates a new, empty [`NetlistConversion`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

/// An indentation-aware text sink.
///
/// Also records the canonical names of the modules defined so far,
/// so that a module name can be defined at most once per pass.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: String,
    indent: usize,
    indent_str: ArcStr,
    names: HashSet<ArcStr>,
    definitions: IndexMap<ModuleId, ArcStr>,
}

impl Writer {
    /// Creates a new, empty writer.
    ///
    /// Each level of indentation is rendered as one copy of `indent_str`.
    pub fn new(indent_str: impl Into<ArcStr>) -> Self {
        Self {
            buf: String::new(),
            indent: 0,
            indent_str: indent_str.into(),
            names: HashSet::new(),
            definitions: IndexMap::new(),
        }
    }

    /// Writes one line of text at the current indentation level.
    ///
    /// Empty lines are written without indentation.
    pub fn write_line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.buf.push_str(&self.indent_str);
            }
            self.buf.push_str(line);
        }
        self.buf.push('\n');
    }

    /// Writes an empty line.
    #[inline]
    pub fn write_blank(&mut self) {
        self.write_line("");
    }

    /// The current indentation level.
    #[inline]
    pub fn indent_level(&self) -> usize {
        self.indent
    }

    /// Sets the current indentation level.
    #[inline]
    pub fn set_indent_level(&mut self, level: usize) {
        self.indent = level;
    }

    /// Increases the indentation level by one.
    #[inline]
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decreases the indentation level by one.
    ///
    /// The level never drops below zero.
    #[inline]
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Records that the module `id` is defined under the canonical name `name`.
    ///
    /// Returns [`Error::DuplicateDefinition`] if `name` was already defined or reserved,
    /// in which case nothing is recorded.
    pub fn define_module(&mut self, id: ModuleId, name: ArcStr) -> Result<()> {
        if self.names.contains(&name) {
            return Err(Error::DuplicateDefinition { name });
        }
        self.names.insert(name.clone());
        self.definitions.insert(id, name);
        Ok(())
    }

    /// Reserves `name` so that no module defined later in the pass may take it.
    ///
    /// Used for the names of external modules, which are referenced verbatim.
    /// Reserving a name twice is not an error.
    pub fn reserve_name(&mut self, name: ArcStr) {
        self.names.insert(name);
    }

    /// Returns `true` if a module with the given canonical name has been defined,
    /// or the name has been reserved.
    #[inline]
    pub fn is_defined(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// The canonical name under which module `id` was defined, if it has been defined.
    #[inline]
    pub fn definition(&self, id: ModuleId) -> Option<&ArcStr> {
        self.definitions.get(&id)
    }

    /// The text written so far.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Consumes the writer, returning the text written and the modules defined.
    pub fn finish(self) -> (String, NetlistConversion) {
        (
            self.buf,
            NetlistConversion {
                modules: self.definitions,
            },
        )
    }

    /// Writes all buffered text to the given output stream.
    pub fn flush_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.buf.as_bytes())?;
        out.flush()
    }
}

/// The definition an instance resolves to.
#[derive(Debug, Copy, Clone)]
pub enum Target<'a> {
    /// A module defined in the library.
    Module(ModuleId, &'a Module),
    /// A module defined outside of the library.
    External(ExternalModuleId, &'a ExternalModule),
}

impl<'a> Target<'a> {
    /// The ports of the target, in declaration order.
    pub fn ports(&self) -> Box<dyn Iterator<Item = &'a Port> + 'a> {
        match *self {
            Self::Module(_, module) => Box::new(module.ports()),
            Self::External(_, module) => Box::new(module.ports()),
        }
    }

    /// The name of the target, as written in the CIR library.
    pub fn name(&self) -> &'a ArcStr {
        match *self {
            Self::Module(_, module) => module.name(),
            Self::External(_, module) => module.name(),
        }
    }
}

/// A resolved [`Reference`].
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// The definition the reference points to.
    pub target: Target<'a>,
    /// The canonical name of the target in the output netlist.
    pub name: ArcStr,
}

/// Resolves references to their definitions and canonical names.
///
/// Canonical names of library modules are computed by a format-specific
/// naming function and memoized, so every lookup of a module within a pass
/// yields the same name. External modules keep their names verbatim.
pub struct Resolver<'a, F> {
    lib: &'a Library,
    naming: F,
    names: HashMap<ModuleId, ArcStr>,
}

impl<'a, F: Fn(&str) -> ArcStr> Resolver<'a, F> {
    /// Creates a resolver for the given library.
    pub fn new(lib: &'a Library, naming: F) -> Self {
        Self {
            lib,
            naming,
            names: HashMap::new(),
        }
    }

    /// The library this resolver resolves against.
    #[inline]
    pub fn lib(&self) -> &'a Library {
        self.lib
    }

    /// The canonical name of module `id`.
    ///
    /// Returns [`None`] if the library has no such module.
    pub fn module_name(&mut self, id: ModuleId) -> Option<ArcStr> {
        let module = self.lib.try_module(id)?;
        Some(self.canonical_name(id, module))
    }

    /// The canonical name of `module`, which must be the module with ID `id`.
    pub fn canonical_name(&mut self, id: ModuleId, module: &Module) -> ArcStr {
        self.names
            .entry(id)
            .or_insert_with(|| (self.naming)(module.name()))
            .clone()
    }

    /// Resolves the given reference.
    ///
    /// Returns [`None`] if the reference points to nothing in the library.
    pub fn resolve(&mut self, reference: Reference) -> Option<Resolved<'a>> {
        let resolved = match reference {
            Reference::Module(id) => {
                let module = self.lib.try_module(id)?;
                let name = self.canonical_name(id, module);
                Resolved {
                    target: Target::Module(id, module),
                    name,
                }
            }
            Reference::External(id) => {
                let module = self.lib.try_external_module(id)?;
                Resolved {
                    target: Target::External(id, module),
                    name: module.name().clone(),
                }
            }
        };
        debug!(%reference, name = %resolved.name, "resolved module reference");
        Some(resolved)
    }
}

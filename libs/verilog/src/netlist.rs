//! Verilog netlist exporter.

use std::collections::HashMap;

use arcstr::ArcStr;
use cir::netlist::{Resolver, Writer};
use cir::{Error, Instance, Library, Module, ModuleId, Result};
use tracing::{span, Level};

use crate::format::{
    format_connection, format_param_decl, format_port_decl, format_signal_decl, get_param_value,
    has_empty_concat, legalize_identifier, module_name,
};
use crate::NetlistOptions;

/// A single Verilog emission pass over a CIR library.
///
/// Owns the [`Writer`] and [`Resolver`] for the pass, so every instance
/// starts from an empty module-name registry.
pub struct NetlisterInstance<'a> {
    lib: &'a Library,
    opts: &'a NetlistOptions,
    resolver: Resolver<'a, fn(&str) -> ArcStr>,
    writer: Writer,
}

impl<'a> NetlisterInstance<'a> {
    /// Creates a new [`NetlisterInstance`].
    pub fn new(lib: &'a Library, opts: &'a NetlistOptions) -> Self {
        Self {
            lib,
            opts,
            resolver: Resolver::new(lib, module_name as fn(&str) -> ArcStr),
            writer: Writer::new(opts.indent.as_str()),
        }
    }

    /// Netlists every module of the library, returning the filled writer.
    pub fn export(mut self) -> Result<Writer> {
        let lib = self.lib;
        let _guard =
            span!(Level::INFO, "writing Verilog netlist", lib.name = %lib.name()).entered();
        if self.opts.prelude {
            self.write_prelude();
        }
        for (_, ext) in lib.external_modules() {
            self.writer.reserve_name(ext.name().clone());
        }
        for (id, _) in lib.modules() {
            self.write_module_definition(id)?;
        }
        Ok(self.writer)
    }

    /// The writer for this pass.
    #[inline]
    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    /// Consumes the netlister, returning its writer.
    #[inline]
    pub fn into_writer(self) -> Writer {
        self.writer
    }

    /// Writes a comment header naming the library.
    pub fn write_prelude(&mut self) {
        self.writer.write_line(format!("// {}", self.lib.name()));
        self.writer.write_line(
            "// This is a generated file. Be careful when editing manually: this file may be overwritten.",
        );
        self.writer.write_blank();
    }

    /// Writes the definition of module `id`, including one instantiation per instance.
    ///
    /// # Panics
    ///
    /// Panics if the library has no module with the given ID.
    pub fn write_module_definition(&mut self, id: ModuleId) -> Result<()> {
        let lib = self.lib;
        let module = lib.module(id);
        let _guard = span!(
            Level::INFO,
            "writing Verilog module",
            module.id = %id,
            module.name = %module.name()
        )
        .entered();

        check_identifiers(module)?;
        let name = self.resolver.canonical_name(id, module);
        self.writer.define_module(id, name.clone())?;

        let params = module
            .params()
            .map(|(pname, param)| {
                format_param_decl(pname, param, module.name(), self.opts.param_types)
            })
            .collect::<Result<Vec<_>>>()?;
        let ports = module
            .ports()
            .map(|port| format_port_decl(port, module.name()))
            .collect::<Result<Vec<_>>>()?;

        self.writer.write_line(format!("module {}", name));
        self.writer.indent();

        if params.is_empty() {
            self.writer.write_line("// No parameters");
        } else {
            self.writer.write_line("#(");
            self.write_list(params);
            self.writer.write_line(")");
        }

        if ports.is_empty() {
            self.writer.write_line("// No ports");
            self.writer.write_line(";");
        } else {
            // A trailing comma after the last port is a syntax error.
            self.writer.write_line("(");
            self.write_list(ports);
            self.writer.write_line(");");
        }
        self.writer.write_blank();

        if module.signals().next().is_some() {
            self.writer.write_line("// Signal Declarations");
            for signal in module.signals() {
                self.writer.write_line(format!("{};", format_signal_decl(signal)));
            }
        } else {
            self.writer.write_line("// No Signal Declarations");
        }
        self.writer.write_blank();

        if module.instances().next().is_some() {
            self.writer.write_line("// Instance Declarations");
            for inst in module.instances() {
                self.write_instance(module, inst)?;
            }
        } else {
            self.writer.write_line("// No Instances");
            self.writer.write_blank();
        }

        self.writer.dedent();
        self.writer.write_line(format!("endmodule // {}", name));
        self.writer.write_blank();
        Ok(())
    }

    /// Writes an instantiation of `inst`, which belongs to `parent`.
    ///
    /// Parameter overrides are written as named overrides, `.NAME(value)`.
    /// Connections are written as `.port(expr)` in the port order of the
    /// instantiated module.
    pub fn write_instance(&mut self, parent: &Module, inst: &Instance) -> Result<()> {
        let resolved = self
            .resolver
            .resolve(inst.module())
            .ok_or_else(|| Error::UnresolvedReference {
                reference: inst.module(),
                instance: inst.name().clone(),
                module: parent.name().clone(),
            })?;

        let params = inst
            .params()
            .map(|(pname, value)| -> Result<String> {
                let value = get_param_value(pname, value, inst.name())?;
                Ok(format!(".{}({})", legalize_identifier(pname), value))
            })
            .collect::<Result<Vec<_>>>()?;

        let connections = resolved
            .target
            .ports()
            .map(|port| -> Result<String> {
                let conn = inst
                    .connection(port.name())
                    .ok_or_else(|| Error::UnconnectedPort {
                        port: port.name().clone(),
                        instance: inst.name().clone(),
                        module: parent.name().clone(),
                    })?;
                if has_empty_concat(conn) {
                    return Err(Error::EmptyConcat {
                        port: port.name().clone(),
                        instance: inst.name().clone(),
                        module: parent.name().clone(),
                    });
                }
                Ok(format!(
                    ".{}({})",
                    legalize_identifier(port.name()),
                    format_connection(conn)
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.writer.write_line(resolved.name.as_str());
        if params.is_empty() {
            self.writer.write_line("// No parameters");
        } else {
            self.writer.write_line("#(");
            self.write_list(params);
            self.writer.write_line(")");
        }

        self.writer.write_line(legalize_identifier(inst.name()));
        if connections.is_empty() {
            self.writer.write_line("// No ports");
            self.writer.write_line("();");
        } else {
            self.writer.write_line("(");
            self.write_list(connections);
            self.writer.write_line(");");
        }
        self.writer.write_blank();
        Ok(())
    }

    /// Writes one entry per line, one level deeper, with a comma after every entry but the last.
    fn write_list(&mut self, entries: Vec<String>) {
        self.writer.indent();
        let last = entries.len().saturating_sub(1);
        for (i, entry) in entries.into_iter().enumerate() {
            if i == last {
                self.writer.write_line(entry);
            } else {
                self.writer.write_line(format!("{},", entry));
            }
        }
        self.writer.dedent();
    }
}

/// Checks that no two names declared in `module` are written as the same identifier.
///
/// Parameters, ports, signals and instances share one namespace per module.
fn check_identifiers(module: &Module) -> Result<()> {
    let mut seen: HashMap<ArcStr, ArcStr> = HashMap::new();
    let names = module
        .params()
        .map(|(name, _)| name)
        .chain(module.ports().map(|port| port.name()))
        .chain(module.signals().map(|signal| &signal.name))
        .chain(module.instances().map(|inst| inst.name()));
    for name in names {
        let ident = legalize_identifier(name);
        if let Some(first) = seen.insert(ident.clone(), name.clone()) {
            return Err(Error::DuplicateIdentifier {
                name: ident,
                first,
                second: name.clone(),
                module: module.name().clone(),
            });
        }
    }
    Ok(())
}

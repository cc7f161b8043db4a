//! Pure formatters for Verilog declarations and expressions.
//!
//! None of these functions touch writer state; each returns the text of a
//! single declaration or expression for the caller to write.

use arcstr::ArcStr;
use cir::{Concat, Connection, Error, Literal, Param, ParamKind, ParamValue, Port, Result, Signal, Slice};
use itertools::Itertools;

/// Keywords that cannot be used as plain Verilog identifiers.
const RESERVED: &[&str] = &[
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0", "bufif1", "case", "casex",
    "casez", "cell", "cmos", "config", "deassign", "default", "defparam", "design", "disable",
    "edge", "else", "end", "endcase", "endconfig", "endfunction", "endgenerate", "endmodule",
    "endprimitive", "endspecify", "endtable", "endtask", "event", "for", "force", "forever",
    "fork", "function", "generate", "genvar", "highz0", "highz1", "if", "ifnone", "incdir",
    "include", "initial", "inout", "input", "instance", "integer", "join", "large", "liblist",
    "library", "localparam", "logic", "longint", "macromodule", "medium", "module", "nand",
    "negedge", "nmos", "nor", "noshowcancelled", "not", "notif0", "notif1", "or", "output",
    "parameter", "pmos", "posedge", "primitive", "pull0", "pull1", "pulldown", "pullup",
    "pulsestyle_ondetect", "pulsestyle_onevent", "rcmos", "real", "realtime", "reg", "release",
    "repeat", "rnmos", "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled",
    "signed", "small", "specify", "specparam", "strong0", "strong1", "string", "supply0",
    "supply1", "table", "task", "time", "tran", "tranif0", "tranif1", "tri", "tri0", "tri1",
    "triand", "trior", "trireg", "unsigned", "use", "uwire", "vectored", "wait", "wand",
    "weak0", "weak1", "while", "wire", "wor", "xnor", "xor",
];

/// Converts `name` into a legal Verilog identifier.
///
/// Characters other than ASCII letters, digits, `_` and `$` become `_`.
/// Identifiers starting with a digit or `$` get a leading `_`,
/// and reserved words get a trailing `_`.
pub fn legalize_identifier(name: &str) -> ArcStr {
    let mut ident: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match ident.chars().next() {
        None => ident.push('_'),
        Some(c) if c.is_ascii_digit() || c == '$' => ident.insert(0, '_'),
        _ => (),
    }
    if RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ArcStr::from(ident)
}

/// The canonical Verilog name of a library module.
///
/// Module names may be qualified with `.`-separated path segments;
/// only the last segment is kept.
pub fn module_name(name: &str) -> ArcStr {
    legalize_identifier(name.rsplit('.').next().unwrap_or(name))
}

/// Formats a connection as a Verilog expression.
pub fn format_connection(conn: &Connection) -> String {
    match conn {
        Connection::Signal(name) => legalize_identifier(name).to_string(),
        Connection::Slice(slice) => format_slice(slice),
        Connection::Concat(concat) => format_concat(concat),
        Connection::Literal(literal) => format_literal(literal),
    }
}

/// Formats a bit-select or part-select of a signal.
pub fn format_slice(slice: &Slice) -> String {
    let name = legalize_identifier(slice.signal());
    if slice.is_bit() {
        format!("{}[{}]", name, slice.top())
    } else {
        format!("{}[{}:{}]", name, slice.top(), slice.bot())
    }
}

/// Formats a concatenation in Verilog `{a, b, c}` form, preserving part order.
pub fn format_concat(concat: &Concat) -> String {
    format!("{{{}}}", concat.parts().map(format_connection).join(", "))
}

/// Returns `true` if `conn` is or contains a concatenation with no parts.
pub fn has_empty_concat(conn: &Connection) -> bool {
    match conn {
        Connection::Concat(concat) => concat.is_empty() || concat.parts().any(has_empty_concat),
        Connection::Signal(_) | Connection::Slice(_) | Connection::Literal(_) => false,
    }
}

/// Formats an integer literal, sized literals in `W'dV` form.
pub fn format_literal(literal: &Literal) -> String {
    match literal.width() {
        Some(width) => format!("{}'d{}", width, literal.value()),
        None => literal.value().to_string(),
    }
}

fn unsupported(param: &str, kind: ParamKind, context: &str) -> Error {
    Error::UnsupportedParameterType {
        param: param.into(),
        kind,
        context: context.into(),
    }
}

/// The Verilog datatype of a parameter.
pub fn format_param_type(name: &str, param: &Param, context: &str) -> Result<&'static str> {
    match param.kind() {
        ParamKind::Integer => Ok("longint"),
        ParamKind::Double => Ok("real"),
        ParamKind::String => Ok("string"),
        kind @ ParamKind::Bool => Err(unsupported(name, kind, context)),
    }
}

/// Formats a parameter value as a Verilog literal.
///
/// `name` and `context` identify the parameter in errors.
pub fn get_param_value(name: &str, value: &ParamValue, context: &str) -> Result<String> {
    match value {
        ParamValue::Integer(value) => Ok(value.to_string()),
        ParamValue::Double(value) if value.is_finite() => Ok(format!("{:?}", value)),
        ParamValue::Double(value) => Err(Error::InvalidParameterValue {
            param: name.into(),
            value: value.to_string().into(),
            context: context.into(),
        }),
        ParamValue::String(value) => Ok(format_string(value)),
        ParamValue::Bool(_) => Err(unsupported(name, value.kind(), context)),
    }
}

/// Formats the default value of a parameter as a Verilog literal, if it has one.
pub fn get_param_default(name: &str, param: &Param, context: &str) -> Result<Option<String>> {
    format_param_type(name, param, context)?;
    param
        .default_value()
        .map(|value| get_param_value(name, &value, context))
        .transpose()
}

/// Formats a parameter declaration.
///
/// The datatype is only included if `with_type` is set.
pub fn format_param_decl(
    name: &str,
    param: &Param,
    context: &str,
    with_type: bool,
) -> Result<String> {
    let mut decl = String::from("parameter");
    if with_type {
        decl.push(' ');
        decl.push_str(format_param_type(name, param, context)?);
    }
    decl.push(' ');
    decl.push_str(&legalize_identifier(name));
    if let Some(default) = get_param_default(name, param, context)? {
        decl.push_str(" = ");
        decl.push_str(&default);
    }
    Ok(decl)
}

/// Formats a port declaration.
///
/// `module` names the module declaring the port in errors.
pub fn format_port_decl(port: &Port, module: &str) -> Result<String> {
    if !port.direction.is_directed() {
        return Err(Error::UndirectedPort {
            port: port.name().clone(),
            module: module.into(),
        });
    }
    Ok(format!(
        "{} {}",
        port.direction,
        format_signal_decl(&port.signal)
    ))
}

/// Formats a signal declaration, without the trailing semicolon.
pub fn format_signal_decl(signal: &Signal) -> String {
    let name = legalize_identifier(&signal.name);
    if signal.width > 1 {
        format!("wire [{}:0] {}", signal.width - 1, name)
    } else {
        format!("wire {}", name)
    }
}

fn format_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

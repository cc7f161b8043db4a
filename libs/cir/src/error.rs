//! Netlisting errors.

use arcstr::ArcStr;
use thiserror::Error as ThisError;

use crate::{ParamKind, Reference};

/// The result type returned by netlisting functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible netlisting errors.
///
/// All errors abort the emission pass in which they occur.
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O error.
    #[error("io error")]
    Io(#[from] std::io::Error),
    /// A module's canonical name was already defined earlier in the same pass,
    /// or is the name of an external module.
    #[error("duplicate definition: module name `{name}` is already defined or reserved")]
    DuplicateDefinition {
        /// The colliding canonical name.
        name: ArcStr,
    },
    /// An instance references a module that is not present in the library.
    #[error("unresolved reference: instance `{instance}` in module `{module}` references {reference}, which is not present in the library")]
    UnresolvedReference {
        /// The unresolvable reference.
        reference: Reference,
        /// The name of the instance.
        instance: ArcStr,
        /// The name of the module containing the instance.
        module: ArcStr,
    },
    /// An instance does not connect one of the ports of the module it instantiates.
    #[error("unconnected port: instance `{instance}` in module `{module}` does not specify a connection for port `{port}`")]
    UnconnectedPort {
        /// The name of the unconnected port.
        port: ArcStr,
        /// The name of the instance.
        instance: ArcStr,
        /// The name of the module containing the instance.
        module: ArcStr,
    },
    /// A port has no direction.
    #[error("undirected port: port `{port}` of module `{module}` has no direction")]
    UndirectedPort {
        /// The name of the port.
        port: ArcStr,
        /// The name of the module declaring the port.
        module: ArcStr,
    },
    /// Two names declared in the same module map to the same output identifier.
    #[error("duplicate identifier: `{first}` and `{second}` in module `{module}` are both written as `{name}`")]
    DuplicateIdentifier {
        /// The colliding output identifier.
        name: ArcStr,
        /// The name declared first.
        first: ArcStr,
        /// The name declared second.
        second: ArcStr,
        /// The name of the module declaring both names.
        module: ArcStr,
    },
    /// A parameter value cannot be written as a literal of the output format.
    #[error("invalid parameter value: parameter `{param}` of `{context}` has value `{value}`")]
    InvalidParameterValue {
        /// The name of the parameter.
        param: ArcStr,
        /// The offending value.
        value: ArcStr,
        /// The name of the module or instance the parameter belongs to.
        context: ArcStr,
    },
    /// A connection contains a concatenation with no parts.
    #[error("empty concatenation: instance `{instance}` in module `{module}` connects an empty concatenation to port `{port}`")]
    EmptyConcat {
        /// The name of the port.
        port: ArcStr,
        /// The name of the instance.
        instance: ArcStr,
        /// The name of the module containing the instance.
        module: ArcStr,
    },
    /// A parameter or parameter value has a type the output format cannot express.
    #[error("unsupported parameter type: parameter `{param}` of `{context}` has type `{kind}`")]
    UnsupportedParameterType {
        /// The name of the parameter.
        param: ArcStr,
        /// The unsupported type.
        kind: ParamKind,
        /// The name of the module or instance the parameter belongs to.
        context: ArcStr,
    },
}

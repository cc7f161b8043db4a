//! Circuit intermediate representation (CIR).
//!
//! A hierarchical, netlist-level representation of modules and the instances
//! they contain. CIR is produced by upstream importers and elaborators and is
//! consumed, read-only, by netlisters that render it into a textual format.
//!
//! Unlike schematic generator APIs, the structures in this crate use strings
//! to name ports, signals, connections and parameters.
//!
//! Signals are either single-bit wires (width 1) or 1-dimensional buses
//! (width greater than 1). Zero-width signals are not supported.
//!
//! Modules are stored in a [`Library`] under opaque identifiers. An
//! [`Instance`] refers to the module it instantiates through a [`Reference`],
//! never by embedding it. A reference may point at a [`Module`] defined in the
//! library or at an [`ExternalModule`], whose body lives outside of the
//! library and of which only the name, ports and parameters are known.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod connection;
pub mod error;
pub mod netlist;
pub mod validation;

pub use connection::{Concat, Connection, Literal, Slice};
pub use error::{Error, Result};


/// An opaque module identifier.
///
/// A module ID created in the context of one library must
/// *not* be used in the context of another library.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ModuleId(u64);

/// An opaque external module identifier.
///
/// An external module ID created in the context of one library must
/// *not* be used in the context of another library.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ExternalModuleId(u64);

impl Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "module{}", self.0)
    }
}

impl Display for ExternalModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "extmodule{}", self.0)
    }
}

/// A reference from an instance to the module it instantiates.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Reference {
    /// A module defined in the same library.
    Module(ModuleId),
    /// A module defined outside of the library.
    External(ExternalModuleId),
}

impl From<ModuleId> for Reference {
    #[inline]
    fn from(value: ModuleId) -> Self {
        Self::Module(value)
    }
}

impl From<ExternalModuleId> for Reference {
    #[inline]
    fn from(value: ExternalModuleId) -> Self {
        Self::External(value)
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module(id) => write!(f, "{id}"),
            Self::External(id) => write!(f, "{id}"),
        }
    }
}

/// Port directions.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize,
)]
pub enum Direction {
    /// Input.
    Input,
    /// Output.
    Output,
    /// Input or output.
    InOut,
    /// No direction has been assigned.
    ///
    /// Importers produce this for ports whose direction was never specified.
    /// Such ports cannot be netlisted.
    #[default]
    NoDirection,
}

impl Direction {
    /// Returns `true` if this direction is one of
    /// [`Input`](Direction::Input), [`Output`](Direction::Output)
    /// or [`InOut`](Direction::InOut).
    ///
    /// # Examples
    ///
    /// ```
    /// use cir::Direction;
    /// assert!(Direction::InOut.is_directed());
    /// assert!(!Direction::NoDirection.is_directed());
    /// ```
    #[inline]
    pub fn is_directed(&self) -> bool {
        !matches!(self, Self::NoDirection)
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::InOut => write!(f, "inout"),
            Self::NoDirection => write!(f, "none"),
        }
    }
}

/// A named wire or bus.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Signal {
    /// The name of this signal.
    pub name: ArcStr,
    /// The width of this signal in bits.
    ///
    /// Width 1 denotes a single-bit wire.
    pub width: usize,
}

impl Signal {
    /// Creates a new signal with the given name and width.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn new(name: impl Into<ArcStr>, width: usize) -> Self {
        assert!(width > 0, "zero-width signals are not supported");
        Self {
            name: name.into(),
            width,
        }
    }

    /// Creates a new single-bit wire.
    #[inline]
    pub fn wire(name: impl Into<ArcStr>) -> Self {
        Self::new(name, 1)
    }

    /// Returns `true` if this signal is a bus.
    #[inline]
    pub fn is_bus(&self) -> bool {
        self.width > 1
    }
}

/// A signal exposed by a module.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Port {
    /// The signal this port exposes.
    pub signal: Signal,
    /// The direction of this port.
    #[serde(default)]
    pub direction: Direction,
}

impl Port {
    /// Creates a new port.
    #[inline]
    pub fn new(signal: Signal, direction: Direction) -> Self {
        Self { signal, direction }
    }

    /// The name of this port.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.signal.name
    }
}

/// The kind of a parameter or parameter value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    /// A signed integer.
    Integer,
    /// A double-precision floating point number.
    Double,
    /// A string.
    String,
    /// A boolean.
    Bool,
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Integer => write!(f, "integer"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// A module parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// An integer parameter.
    Integer {
        /// The default value.
        default: Option<i64>,
    },
    /// A floating point parameter.
    Double {
        /// The default value.
        default: Option<f64>,
    },
    /// A string parameter.
    String {
        /// The default value.
        default: Option<ArcStr>,
    },
    /// A boolean parameter.
    Bool {
        /// The default value.
        default: Option<bool>,
    },
}

impl Param {
    /// Whether or not the parameter has a default value.
    pub fn has_default(&self) -> bool {
        self.default_value().is_some()
    }

    /// The default value of this parameter, if there is one.
    pub fn default_value(&self) -> Option<ParamValue> {
        match self {
            Self::Integer { default } => default.map(ParamValue::Integer),
            Self::Double { default } => default.map(ParamValue::Double),
            Self::String { default } => default.clone().map(ParamValue::String),
            Self::Bool { default } => default.map(ParamValue::Bool),
        }
    }

    /// The kind of this parameter.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Integer { .. } => ParamKind::Integer,
            Self::Double { .. } => ParamKind::Double,
            Self::String { .. } => ParamKind::String,
            Self::Bool { .. } => ParamKind::Bool,
        }
    }
}

/// A parameter value, typically assigned by an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// An integer.
    Integer(i64),
    /// A floating point number.
    Double(f64),
    /// A string.
    String(ArcStr),
    /// A boolean.
    Bool(bool),
}

impl ParamValue {
    /// The kind of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Integer(_) => ParamKind::Integer,
            Self::Double(_) => ParamKind::Double,
            Self::String(_) => ParamKind::String,
            Self::Bool(_) => ParamKind::Bool,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<ArcStr> for ParamValue {
    fn from(value: ArcStr) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An instance of a module placed inside a parent module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The name of this instance.
    ///
    /// This is not necessarily the name of the instantiated module.
    name: ArcStr,
    /// The module being instantiated.
    module: Reference,
    /// Parameter overrides, in the order they were assigned.
    #[serde(default)]
    params: IndexMap<ArcStr, ParamValue>,
    /// A map mapping port names to connections.
    ///
    /// The ports are the ports of the **instantiated** module.
    /// The signals are signals of the **parent** module.
    #[serde(default)]
    connections: HashMap<ArcStr, Connection>,
}

impl Instance {
    /// Create an instance of the given module with the given name.
    pub fn new(name: impl Into<ArcStr>, module: impl Into<Reference>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            params: IndexMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Connect the given port of the instantiated module to the given connection
    /// in the parent module.
    #[inline]
    pub fn connect(&mut self, port: impl Into<ArcStr>, conn: impl Into<Connection>) {
        self.connections.insert(port.into(), conn.into());
    }

    /// Override the value of the given parameter.
    #[inline]
    pub fn set_param(&mut self, param: impl Into<ArcStr>, value: impl Into<ParamValue>) {
        self.params.insert(param.into(), value.into());
    }

    /// The name of this instance.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The module this instance instantiates.
    #[inline]
    pub fn module(&self) -> Reference {
        self.module
    }

    /// Iterate over the parameter overrides of this instance, in assignment order.
    #[inline]
    pub fn params(&self) -> impl Iterator<Item = (&ArcStr, &ParamValue)> {
        self.params.iter()
    }

    /// The number of parameter overrides on this instance.
    #[inline]
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Iterate over the connections of this instance.
    ///
    /// The iteration order is unspecified.
    #[inline]
    pub fn connections(&self) -> impl Iterator<Item = (&ArcStr, &Connection)> {
        self.connections.iter()
    }

    /// The connection to the given port, if there is one.
    #[inline]
    pub fn connection(&self, port: &str) -> Option<&Connection> {
        self.connections.get(port)
    }
}

/// A module with a body that can be netlisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    name: ArcStr,
    #[serde(default)]
    ports: Vec<Port>,
    #[serde(default)]
    signals: Vec<Signal>,
    #[serde(default)]
    params: IndexMap<ArcStr, Param>,
    #[serde(default)]
    instances: Vec<Instance>,
}

impl Module {
    /// Creates a new, empty module with the given name.
    ///
    /// The name may be qualified with `.`-separated path segments.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            signals: Vec::new(),
            params: IndexMap::new(),
            instances: Vec::new(),
        }
    }

    /// The name of the module.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds a port to the end of this module's port list.
    ///
    /// Returns a connection referring to the port's signal.
    pub fn add_port(&mut self, port: Port) -> Connection {
        let conn = Connection::signal(port.signal.name.clone());
        self.ports.push(port);
        conn
    }

    /// Declares a new internal (non-port) signal.
    ///
    /// Returns a connection referring to the signal.
    pub fn add_signal(&mut self, signal: Signal) -> Connection {
        let conn = Connection::signal(signal.name.clone());
        self.signals.push(signal);
        conn
    }

    /// Declares a parameter with the given name.
    ///
    /// Redeclaring a parameter replaces its declaration but keeps its position.
    #[inline]
    pub fn add_param(&mut self, name: impl Into<ArcStr>, param: Param) {
        self.params.insert(name.into(), param);
    }

    /// Adds the given instance to the end of this module's instance list.
    #[inline]
    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    /// Iterate over the ports of this module, in declaration order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// The number of ports of this module.
    #[inline]
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Get a port of this module by name.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|port| port.name() == name)
    }

    /// Iterate over the internal signals of this module, in declaration order.
    ///
    /// Does not include signals exposed as ports.
    #[inline]
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// Get a signal or port signal of this module by name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.ports
            .iter()
            .map(|port| &port.signal)
            .chain(self.signals.iter())
            .find(|signal| signal.name == name)
    }

    /// Iterate over the parameters of this module, in declaration order.
    #[inline]
    pub fn params(&self) -> impl Iterator<Item = (&ArcStr, &Param)> {
        self.params.iter()
    }

    /// The number of parameters declared by this module.
    #[inline]
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Iterate over the instances of this module, in the order they were added.
    #[inline]
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }
}

/// A module whose body is defined outside of a CIR library.
///
/// Only its name, port order and parameters are known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalModule {
    name: ArcStr,
    #[serde(default)]
    ports: Vec<Port>,
    #[serde(default)]
    params: IndexMap<ArcStr, Param>,
}

impl ExternalModule {
    /// Creates a new external module with the given name and no ports.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            params: IndexMap::new(),
        }
    }

    /// The name of the external module.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds a port to the end of this module's port list.
    #[inline]
    pub fn add_port(&mut self, port: Port) {
        self.ports.push(port);
    }

    /// Declares a parameter with the given name.
    #[inline]
    pub fn add_param(&mut self, name: impl Into<ArcStr>, param: Param) {
        self.params.insert(name.into(), param);
    }

    /// Iterate over the ports of this module, in declaration order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Iterate over the parameters of this module, in declaration order.
    #[inline]
    pub fn params(&self) -> impl Iterator<Item = (&ArcStr, &Param)> {
        self.params.iter()
    }
}

/// A library of CIR modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// The name of the library.
    name: ArcStr,

    /// The last module ID assigned.
    ///
    /// Initialized to 0 when the library is created.
    #[serde(default)]
    module_id: u64,

    /// The last external module ID assigned.
    #[serde(default)]
    external_module_id: u64,

    /// The modules in the library, in the order they were added.
    #[serde(default)]
    modules: IndexMap<ModuleId, Module>,

    /// The external modules referenced by the library.
    #[serde(default)]
    external_modules: IndexMap<ExternalModuleId, ExternalModule>,
}

impl Library {
    /// Creates a new, empty library.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            module_id: 0,
            external_module_id: 0,
            modules: IndexMap::new(),
            external_modules: IndexMap::new(),
        }
    }

    /// The name of the library.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds the given module to the library.
    ///
    /// Returns the ID of the newly added module.
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let id = self.alloc_module_id();
        self.modules.insert(id, module);
        id
    }

    /// Adds the given external module to the library.
    ///
    /// Returns the ID of the newly added external module.
    pub fn add_external_module(&mut self, module: ExternalModule) -> ExternalModuleId {
        let id = self.alloc_external_module_id();
        self.external_modules.insert(id, module);
        id
    }

    // Libraries loaded from disk may not carry their ID counters,
    // so never hand out an ID at or below one already in use.
    fn alloc_module_id(&mut self) -> ModuleId {
        let last = self.modules.keys().map(|id| id.0).max().unwrap_or_default();
        self.module_id = std::cmp::max(self.module_id, last) + 1;
        ModuleId(self.module_id)
    }

    fn alloc_external_module_id(&mut self) -> ExternalModuleId {
        let last = self
            .external_modules
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or_default();
        self.external_module_id = std::cmp::max(self.external_module_id, last) + 1;
        ExternalModuleId(self.external_module_id)
    }

    /// Gets the module with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no module has the given ID.
    /// For a non-panicking alternative, see [`try_module`](Library::try_module).
    pub fn module(&self, id: ModuleId) -> &Module {
        match self.modules.get(&id) {
            Some(module) => module,
            None => {
                tracing::error!("no module with ID `{}` in CIR library `{}`", id, self.name);
                panic!("no module with ID `{}` in CIR library `{}`", id, self.name);
            }
        }
    }

    /// Gets the module with the given ID.
    #[inline]
    pub fn try_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    /// Gets a mutable reference to the module with the given ID.
    #[inline]
    pub fn try_module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(&id)
    }

    /// Gets the external module with the given ID.
    #[inline]
    pub fn try_external_module(&self, id: ExternalModuleId) -> Option<&ExternalModule> {
        self.external_modules.get(&id)
    }

    /// Gets the ID of the first module with the given name.
    pub fn try_module_id_named(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, module)| module.name() == name)
            .map(|(id, _)| *id)
    }

    /// Gets the ID of the first external module with the given name.
    pub fn try_external_module_id_named(&self, name: &str) -> Option<ExternalModuleId> {
        self.external_modules
            .iter()
            .find(|(_, module)| module.name() == name)
            .map(|(id, _)| *id)
    }

    /// Iterates over the `(id, module)` pairs in this library, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().map(|(id, module)| (*id, module))
    }

    /// Iterates over the `(id, external module)` pairs in this library, in insertion order.
    pub fn external_modules(&self) -> impl Iterator<Item = (ExternalModuleId, &ExternalModule)> {
        self.external_modules
            .iter()
            .map(|(id, module)| (*id, module))
    }
}

//! CIR validation utilities.
//!
//! Netlisters do not check electrical or structural consistency beyond what
//! they need to produce syntactically complete output. This module provides
//! the checks an upstream stage should run before handing a library to a
//! netlister.

use std::collections::HashSet;
use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use tracing::{span, Level};

use crate::netlist::Target;
use crate::{Connection, Library, Module, ModuleId, Reference};

/// An enumeration of possible severity levels.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Netlisting a library with errors will fail or produce an invalid netlist.
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An issue identified during validation of a CIR library.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidatorIssue {
    cause: Cause,
    severity: Severity,
}

/// The cause of a [`ValidatorIssue`].
#[allow(missing_docs)]
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cause {
    /// Two modules have the same name.
    DuplicateModuleNames {
        id1: ModuleId,
        id2: ModuleId,
        name: ArcStr,
    },
    /// Two signals or ports in a module have the same name.
    DuplicateSignalNames { name: ArcStr, module: ArcStr },
    /// Two instances in the same module have the same name.
    DuplicateInstanceNames { name: ArcStr, module: ArcStr },
    /// A signal was declared with width zero.
    ZeroWidthSignal { name: ArcStr, module: ArcStr },
    /// A port has no direction.
    UndirectedPort { port: ArcStr, module: ArcStr },
    /// An instance references a module not present in the library.
    UnresolvedReference {
        reference: Reference,
        instance: ArcStr,
        module: ArcStr,
    },
    /// An instance does not specify a connection to a port of the module it instantiates.
    UnconnectedPort {
        port: ArcStr,
        target: ArcStr,
        instance: ArcStr,
        module: ArcStr,
    },
    /// An instance specifies a connection to a port that the instantiated module does not have.
    ExtraPort {
        port: ArcStr,
        target: ArcStr,
        instance: ArcStr,
        module: ArcStr,
    },
    /// A connection refers to a signal that is not declared in the module.
    UndeclaredSignal {
        signal: ArcStr,
        instance: ArcStr,
        module: ArcStr,
    },
    /// A connection contains a concatenation with no parts.
    EmptyConcat { instance: ArcStr, module: ArcStr },
    /// A slice selects bits outside of its signal, or has its indices reversed.
    InvalidSlice {
        signal: ArcStr,
        top: usize,
        bot: usize,
        width: usize,
        module: ArcStr,
    },
}

impl ValidatorIssue {
    /// Creates a new validator issue from the given cause and severity.
    pub(crate) fn new(cause: Cause, severity: Severity) -> Self {
        Self { cause, severity }
    }

    /// Creates a new validator issue and logs it immediately.
    ///
    /// The log level will be selected according to the given severity.
    pub(crate) fn new_and_log(cause: Cause, severity: Severity) -> Self {
        let result = Self::new(cause, severity);
        match severity {
            Severity::Info => tracing::event!(Level::INFO, issue = ?result.cause, "{}", result),
            Severity::Warning => tracing::event!(Level::WARN, issue = ?result.cause, "{}", result),
            Severity::Error => tracing::event!(Level::ERROR, issue = ?result.cause, "{}", result),
        }
        result
    }

    /// Gets the underlying cause of this issue.
    #[inline]
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The severity of this issue.
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl Display for ValidatorIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.cause)
    }
}

impl Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateModuleNames { name, .. } => write!(
                f,
                "duplicate module names: found two or more modules named `{}`",
                name
            ),
            Self::DuplicateSignalNames { name, module } => write!(
                f,
                "duplicate signal names: found two or more signals named `{}` in module `{}`",
                name, module
            ),
            Self::DuplicateInstanceNames { name, module } => write!(
                f,
                "duplicate instance names: found two or more instances named `{}` in module `{}`",
                name, module
            ),
            Self::ZeroWidthSignal { name, module } => write!(
                f,
                "zero-width signal: signal `{}` in module `{}` has width 0",
                name, module
            ),
            Self::UndirectedPort { port, module } => write!(
                f,
                "undirected port: port `{}` of module `{}` has no direction",
                port, module
            ),
            Self::UnresolvedReference { reference, instance, module } => write!(
                f,
                "unresolved reference: instance `{}` in module `{}` references {}, but it was not found in the library",
                instance, module, reference
            ),
            Self::UnconnectedPort { port, target, instance, module } => write!(
                f,
                "unconnected port: instance `{}` in module `{}` does not specify a connection for port `{}` of module `{}`",
                instance, module, port, target
            ),
            Self::ExtraPort { port, target, instance, module } => write!(
                f,
                "extra port: instance `{}` in module `{}` specifies a connection for port `{}` of module `{}`, but this module has no such port",
                instance, module, port, target
            ),
            Self::UndeclaredSignal { signal, instance, module } => write!(
                f,
                "undeclared signal: instance `{}` in module `{}` connects to signal `{}`, which is not declared",
                instance, module, signal
            ),
            Self::EmptyConcat { instance, module } => write!(
                f,
                "empty concatenation: instance `{}` in module `{}` connects a concatenation with no parts",
                instance, module
            ),
            Self::InvalidSlice { signal, top, bot, width, module } => write!(
                f,
                "invalid slice: `{}[{}:{}]` in module `{}` does not select bits of a signal with width {}",
                signal, top, bot, module, width
            ),
        }
    }
}

/// A collection of issues.
#[derive(Debug, Clone, Default)]
pub struct IssueSet {
    issues: Vec<ValidatorIssue>,
    num_errors: usize,
    num_warnings: usize,
}

impl IssueSet {
    /// Creates a new, empty issue set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given issue to the issue set.
    pub fn add(&mut self, issue: ValidatorIssue) {
        match issue.severity() {
            Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            Severity::Info => (),
        }
        self.issues.push(issue);
    }

    /// Returns an iterator over all issues in the set.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ValidatorIssue> {
        self.issues.iter()
    }

    /// The number of issues in this issue set.
    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns `true` if this issue set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `true` if this issue set contains an error.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.num_errors > 0
    }

    /// The number of errors in this issue set.
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// The number of warnings in this issue set.
    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }
}

impl IntoIterator for IssueSet {
    type Item = ValidatorIssue;
    type IntoIter = std::vec::IntoIter<ValidatorIssue>;
    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl Display for IssueSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for issue in self.issues.iter() {
            writeln!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl Library {
    /// Check whether or not this library is valid.
    pub fn validate(&self) -> IssueSet {
        let _guard =
            span!(Level::INFO, "validating CIR library", lib.name = %self.name()).entered();
        let mut issues = IssueSet::new();

        let mut names = std::collections::HashMap::new();
        for (id, module) in self.modules() {
            if let Some(&prev) = names.get(module.name()) {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::DuplicateModuleNames {
                        id1: prev,
                        id2: id,
                        name: module.name().clone(),
                    },
                    Severity::Error,
                ));
            } else {
                names.insert(module.name().clone(), id);
            }
        }

        for (id, module) in self.modules() {
            self.validate_module(id, module, &mut issues);
        }
        issues
    }

    fn validate_module(&self, id: ModuleId, module: &Module, issues: &mut IssueSet) {
        let _guard = span!(
            Level::INFO,
            "validating CIR module",
            module.id = %id,
            module.name = %module.name()
        )
        .entered();
        let module_name = module.name();

        let mut signals = HashSet::new();
        let declared = module
            .ports()
            .map(|port| &port.signal)
            .chain(module.signals());
        for signal in declared {
            if !signals.insert(signal.name.clone()) {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::DuplicateSignalNames {
                        name: signal.name.clone(),
                        module: module_name.clone(),
                    },
                    Severity::Error,
                ));
            }
            if signal.width == 0 {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::ZeroWidthSignal {
                        name: signal.name.clone(),
                        module: module_name.clone(),
                    },
                    Severity::Error,
                ));
            }
        }

        for port in module.ports() {
            if !port.direction.is_directed() {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::UndirectedPort {
                        port: port.name().clone(),
                        module: module_name.clone(),
                    },
                    Severity::Error,
                ));
            }
        }

        let mut instances = HashSet::new();
        for inst in module.instances() {
            if !instances.insert(inst.name().clone()) {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::DuplicateInstanceNames {
                        name: inst.name().clone(),
                        module: module_name.clone(),
                    },
                    Severity::Error,
                ));
            }

            let target = match inst.module() {
                Reference::Module(id) => self.try_module(id).map(|m| Target::Module(id, m)),
                Reference::External(id) => self
                    .try_external_module(id)
                    .map(|m| Target::External(id, m)),
            };
            let Some(target) = target else {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::UnresolvedReference {
                        reference: inst.module(),
                        instance: inst.name().clone(),
                        module: module_name.clone(),
                    },
                    Severity::Error,
                ));
                continue;
            };

            let mut ports = HashSet::new();
            for port in target.ports() {
                ports.insert(port.name().clone());
                if inst.connection(port.name()).is_none() {
                    issues.add(ValidatorIssue::new_and_log(
                        Cause::UnconnectedPort {
                            port: port.name().clone(),
                            target: target.name().clone(),
                            instance: inst.name().clone(),
                            module: module_name.clone(),
                        },
                        Severity::Error,
                    ));
                }
            }

            for (port, conn) in inst.connections() {
                if !ports.contains(port) {
                    issues.add(ValidatorIssue::new_and_log(
                        Cause::ExtraPort {
                            port: port.clone(),
                            target: target.name().clone(),
                            instance: inst.name().clone(),
                            module: module_name.clone(),
                        },
                        Severity::Warning,
                    ));
                }
                self.validate_connection(module, inst.name(), conn, issues);
            }
        }
    }

    fn validate_connection(
        &self,
        module: &Module,
        instance: &ArcStr,
        conn: &Connection,
        issues: &mut IssueSet,
    ) {
        let (name, slice) = match conn {
            Connection::Signal(name) => (name, None),
            Connection::Slice(slice) => (slice.signal(), Some(slice)),
            Connection::Concat(concat) => {
                if concat.is_empty() {
                    issues.add(ValidatorIssue::new_and_log(
                        Cause::EmptyConcat {
                            instance: instance.clone(),
                            module: module.name().clone(),
                        },
                        Severity::Error,
                    ));
                }
                for part in concat.parts() {
                    self.validate_connection(module, instance, part, issues);
                }
                return;
            }
            Connection::Literal(_) => return,
        };

        let Some(signal) = module.signal(name) else {
            issues.add(ValidatorIssue::new_and_log(
                Cause::UndeclaredSignal {
                    signal: name.clone(),
                    instance: instance.clone(),
                    module: module.name().clone(),
                },
                Severity::Error,
            ));
            return;
        };
        if let Some(slice) = slice {
            if slice.top() < slice.bot() || slice.top() >= signal.width {
                issues.add(ValidatorIssue::new_and_log(
                    Cause::InvalidSlice {
                        signal: name.clone(),
                        top: slice.top(),
                        bot: slice.bot(),
                        width: signal.width,
                        module: module.name().clone(),
                    },
                    Severity::Error,
                ));
            }
        }
    }
}

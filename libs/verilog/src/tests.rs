use std::path::PathBuf;

use cir::netlist::Netlister;
use cir::{
    Concat, Connection, Direction, ExternalModule, Instance, Library, Literal, Module, ModuleId,
    Param, ParamKind, ParamValue, Port, Signal,
};
use test_log::test;

use crate::format::{
    format_connection, format_param_decl, get_param_value, legalize_identifier, module_name,
};
use crate::netlist::NetlisterInstance;
use crate::{netlist_to_string, Error, NetlistOptions, Verilog};

const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

fn no_prelude() -> NetlistOptions {
    NetlistOptions::default().prelude(false)
}

fn inverter() -> Module {
    let mut inv = Module::new("cells.inv");
    inv.add_port(Port::new(Signal::wire("a"), Direction::Input));
    inv.add_port(Port::new(Signal::wire("y"), Direction::Output));
    inv
}

/// A library with an inverter and a top module instantiating it twice.
fn inverter_chain() -> (Library, ModuleId) {
    let mut lib = Library::new("chain");
    let inv = lib.add_module(inverter());

    let mut top = Module::new("top");
    top.add_param("W", Param::Integer { default: Some(4) });
    let din = top.add_port(Port::new(Signal::new("din", 4), Direction::Input));
    let dout = top.add_port(Port::new(Signal::wire("dout"), Direction::Output));
    let mid = top.add_signal(Signal::wire("mid"));
    assert_eq!(din, Connection::signal("din"));

    let mut i0 = Instance::new("i0", inv);
    i0.connect("y", mid.clone());
    i0.connect("a", Connection::bit("din", 3));
    top.add_instance(i0);

    let mut i1 = Instance::new("i1", inv);
    i1.set_param("W", 8i64);
    i1.connect("a", mid);
    i1.connect("y", dout);
    top.add_instance(i1);

    let top = lib.add_module(top);
    (lib, top)
}

#[test]
fn netlist_inverter_chain() {
    let (lib, _) = inverter_chain();
    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    let expected = r#"module inv
  // No parameters
  (
    input wire a,
    output wire y
  );

  // No Signal Declarations

  // No Instances

endmodule // inv

module top
  #(
    parameter W = 4
  )
  (
    input wire [3:0] din,
    output wire dout
  );

  // Signal Declarations
  wire mid;

  // Instance Declarations
  inv
  // No parameters
  i0
  (
    .a(din[3]),
    .y(mid)
  );

  inv
  #(
    .W(8)
  )
  i1
  (
    .a(mid),
    .y(dout)
  );

endmodule // top

"#;
    assert_eq!(text, expected);
}

#[test]
fn netlist_includes_prelude() {
    let (lib, _) = inverter_chain();
    let text = netlist_to_string(&lib, &NetlistOptions::default()).unwrap();
    assert!(text.starts_with("// chain\n// This is a generated file."));
    assert!(text.contains("\n\nmodule inv\n"));
}

#[test]
fn netlist_is_deterministic() {
    let (lib, _) = inverter_chain();
    let opts = NetlistOptions::default();
    let first = netlist_to_string(&lib, &opts).unwrap();
    let second = netlist_to_string(&lib, &opts).unwrap();
    assert_eq!(first, second);
}

#[test]
fn port_lists_have_no_trailing_comma() {
    let mut lib = Library::new("lib");
    let mut module = Module::new("wide");
    for i in 0..5 {
        module.add_port(Port::new(Signal::wire(format!("p{i}")), Direction::InOut));
    }
    lib.add_module(module);

    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    let ports = text
        .lines()
        .filter(|line| line.trim_start().starts_with("inout wire"))
        .collect::<Vec<_>>();
    assert_eq!(ports.len(), 5);
    assert_eq!(ports.iter().filter(|line| line.ends_with(',')).count(), 4);
    assert_eq!(ports.last().unwrap().trim(), "inout wire p4");
    assert!(!text.contains(",\n  );"));
}

#[test]
fn connections_follow_target_port_order() {
    let mut lib = Library::new("lib");
    let mut mux = Module::new("mux");
    for name in ["sel", "b", "a", "y"] {
        let dir = if name == "y" {
            Direction::Output
        } else {
            Direction::Input
        };
        mux.add_port(Port::new(Signal::wire(name), dir));
    }
    let mux = lib.add_module(mux);

    let mut top = Module::new("top");
    for name in ["n0", "n1", "n2", "n3"] {
        top.add_signal(Signal::wire(name));
    }
    let mut inst = Instance::new("m0", mux);
    inst.connect("a", Connection::signal("n0"));
    inst.connect("y", Connection::signal("n1"));
    inst.connect("b", Connection::signal("n2"));
    inst.connect("sel", Connection::signal("n3"));
    top.add_instance(inst);
    lib.add_module(top);

    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    assert!(text.contains(
        "  m0\n  (\n    .sel(n3),\n    .b(n2),\n    .a(n0),\n    .y(n1)\n  );\n"
    ));
}

#[test]
fn external_modules_are_referenced_verbatim() {
    let mut lib = Library::new("lib");
    let mut ext = ExternalModule::new("sky130_fd_sc_hd__inv_1");
    ext.add_port(Port::new(Signal::wire("Y"), Direction::Output));
    ext.add_port(Port::new(Signal::wire("A"), Direction::Input));
    let ext = lib.add_external_module(ext);

    let mut top = Module::new("top");
    top.add_signal(Signal::wire("x"));
    top.add_signal(Signal::wire("z"));
    let mut inst = Instance::new("u0", ext);
    inst.connect("A", Connection::signal("x"));
    inst.connect("Y", Connection::signal("z"));
    top.add_instance(inst);
    lib.add_module(top);

    let mut out = Vec::new();
    let conv = Verilog.write_netlist(&lib, &mut out, &no_prelude()).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(
        "  sky130_fd_sc_hd__inv_1\n  // No parameters\n  u0\n  (\n    .Y(z),\n    .A(x)\n  );\n"
    ));
    assert!(!text.contains("module sky130_fd_sc_hd__inv_1"));
    assert_eq!(conv.modules.len(), 1);
    assert_eq!(conv.modules.values().next().unwrap(), "top");
}

#[test]
fn modules_may_be_instantiated_before_definition() {
    let mut lib = Library::new("lib");
    let mut top = Module::new("top");
    top.add_signal(Signal::wire("x"));
    let mut leaf = Module::new("leaf");
    leaf.add_port(Port::new(Signal::wire("p"), Direction::InOut));

    let top_id = lib.add_module(Module::new("placeholder"));
    let leaf_id = lib.add_module(leaf);
    let mut inst = Instance::new("l0", leaf_id);
    inst.connect("p", Connection::signal("x"));
    top.add_instance(inst);
    *lib.try_module_mut(top_id).unwrap() = top;

    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    let inst_at = text.find("  leaf\n").unwrap();
    let def_at = text.find("module leaf\n").unwrap();
    assert!(inst_at < def_at);
}

#[test]
fn netlist_conversion_maps_ids_to_names() {
    let (lib, top) = inverter_chain();
    let inv = lib.try_module_id_named("cells.inv").unwrap();
    let mut out = Vec::new();
    let conv = crate::export_verilog(&lib, &mut out).unwrap();
    let names = conv
        .modules
        .iter()
        .map(|(id, name)| (*id, name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(names, [(inv, "inv"), (top, "top")]);
}

#[test]
fn duplicate_definitions_are_rejected() {
    let mut lib = Library::new("lib");
    let a = lib.add_module(Module::new("a.inv"));
    let b = lib.add_module(Module::new("b.inv"));
    let opts = no_prelude();

    let mut netlister = NetlisterInstance::new(&lib, &opts);
    netlister.write_module_definition(a).unwrap();
    let before = netlister.writer().as_str().to_string();
    let err = netlister.write_module_definition(b).unwrap_err();
    assert!(matches!(err, Error::DuplicateDefinition { ref name } if name == "inv"));
    assert_eq!(netlister.writer().as_str(), before);

    assert!(matches!(
        netlist_to_string(&lib, &opts),
        Err(Error::DuplicateDefinition { .. })
    ));
}

#[test]
fn unconnected_ports_are_rejected() {
    let mut lib = Library::new("lib");
    let inv = lib.add_module(inverter());
    let mut top = Module::new("top");
    top.add_signal(Signal::wire("x"));
    let mut inst = Instance::new("i0", inv);
    inst.connect("a", Connection::signal("x"));
    top.add_instance(inst);
    let top = lib.add_module(top);
    let opts = no_prelude();

    let mut netlister = NetlisterInstance::new(&lib, &opts);
    let err = netlister.write_module_definition(top).unwrap_err();
    match &err {
        Error::UnconnectedPort {
            port,
            instance,
            module,
        } => {
            assert_eq!(port, "y");
            assert_eq!(instance, "i0");
            assert_eq!(module, "top");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("`y`"));
    let text = netlister.writer().as_str();
    assert!(!text.contains(".a(x)"));
    assert!(!text.contains("i0"));
}

#[test]
fn undirected_ports_are_rejected() {
    let mut lib = Library::new("lib");
    let mut module = Module::new("floating");
    module.add_port(Port::new(Signal::wire("x"), Direction::NoDirection));
    lib.add_module(module);

    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(
        err,
        Error::UndirectedPort { ref port, ref module } if port == "x" && module == "floating"
    ));
}

#[test]
fn unresolved_references_are_rejected() {
    let mut other = Library::new("other");
    other.add_external_module(ExternalModule::new("a"));
    let dangling = other.add_external_module(ExternalModule::new("b"));

    let mut lib = Library::new("lib");
    let mut top = Module::new("top");
    top.add_instance(Instance::new("i0", dangling));
    lib.add_module(top);

    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedReference { ref instance, ref module, .. } if instance == "i0" && module == "top"
    ));
}

#[test]
fn bool_parameters_are_unsupported() {
    let mut lib = Library::new("lib");
    let mut flag = Module::new("flag");
    flag.add_param("EN", Param::Bool { default: Some(true) });
    lib.add_module(flag);
    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedParameterType { ref param, kind: ParamKind::Bool, ref context }
            if param == "EN" && context == "flag"
    ));

    let mut lib = Library::new("lib");
    let leaf = lib.add_module(Module::new("leaf"));
    let mut top = Module::new("top");
    let mut inst = Instance::new("l0", leaf);
    inst.set_param("EN", false);
    top.add_instance(inst);
    lib.add_module(top);
    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedParameterType { ref context, .. } if context == "l0"
    ));

    // Bool parameters without defaults are still rejected.
    let err = format_param_decl("EN", &Param::Bool { default: None }, "m", false).unwrap_err();
    assert!(matches!(err, Error::UnsupportedParameterType { .. }));
}

#[test]
fn formats_connections() {
    let conn = Connection::concat([
        Connection::slice("bus", 3, 2),
        Connection::signal("b"),
        Connection::bit("c", 0),
    ]);
    assert_eq!(format_connection(&conn), "{bus[3:2], b, c[0]}");

    let nested = Connection::concat([
        Connection::concat([Connection::signal("a"), Connection::signal("b")]),
        Literal::sized(2, 1).into(),
    ]);
    assert_eq!(format_connection(&nested), "{{a, b}, 2'd1}");

    assert_eq!(format_connection(&Literal::inferred(7).into()), "7");
    assert_eq!(format_connection(&Connection::signal("input")), "input_");
}

#[test]
fn legalizes_identifiers() {
    assert_eq!(module_name("lib.cells.inv"), "inv");
    assert_eq!(module_name("plain"), "plain");
    assert_eq!(legalize_identifier("1x"), "_1x");
    assert_eq!(legalize_identifier("a-b"), "a_b");
    assert_eq!(legalize_identifier("module"), "module_");
    assert_eq!(legalize_identifier("$sys"), "_$sys");
    assert_eq!(legalize_identifier(""), "_");
    assert_eq!(legalize_identifier("ok_Name$2"), "ok_Name$2");
}

#[test]
fn formats_parameters() {
    let int = Param::Integer { default: Some(-3) };
    let real = Param::Double { default: Some(1.0) };
    let string = Param::String {
        default: Some("say \"hi\"\\".into()),
    };
    let bare = Param::Integer { default: None };

    assert_eq!(format_param_decl("N", &int, "m", false).unwrap(), "parameter N = -3");
    assert_eq!(format_param_decl("N", &int, "m", true).unwrap(), "parameter longint N = -3");
    assert_eq!(format_param_decl("R", &real, "m", true).unwrap(), "parameter real R = 1.0");
    assert_eq!(
        format_param_decl("S", &string, "m", true).unwrap(),
        r#"parameter string S = "say \"hi\"\\""#
    );
    assert_eq!(format_param_decl("B", &bare, "m", false).unwrap(), "parameter B");

    assert_eq!(get_param_value("x", &ParamValue::Double(2.5e-9), "m").unwrap(), "2.5e-9");
    assert_eq!(get_param_value("x", &ParamValue::Integer(42), "m").unwrap(), "42");
}

#[test]
fn typed_parameters_option() {
    let mut lib = Library::new("lib");
    let mut cap = Module::new("cap");
    cap.add_param("C", Param::Double { default: Some(1e-15) });
    cap.add_param("MODEL", Param::String { default: Some("mim".into()) });
    lib.add_module(cap);

    let opts = no_prelude().param_types(true).indent("\t");
    let text = netlist_to_string(&lib, &opts).unwrap();
    assert!(text.contains(
        "\t#(\n\t\tparameter real C = 1e-15,\n\t\tparameter string MODEL = \"mim\"\n\t)\n"
    ));
}

#[test]
fn empty_module_markers() {
    let mut lib = Library::new("lib");
    lib.add_module(Module::new("empty"));
    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    assert_eq!(
        text,
        "module empty\n  // No parameters\n  // No ports\n  ;\n\n  // No Signal Declarations\n\n  // No Instances\n\nendmodule // empty\n\n"
    );

    let mut lib = Library::new("lib");
    let leaf = lib.add_module(Module::new("leaf"));
    let mut top = Module::new("top");
    top.add_instance(Instance::new("l0", leaf));
    lib.add_module(top);
    let text = netlist_to_string(&lib, &no_prelude()).unwrap();
    assert!(text.contains("  leaf\n  // No parameters\n  l0\n  // No ports\n  ();\n"));
}

#[test]
fn options_from_toml() {
    let opts: NetlistOptions = toml::from_str("indent = \"    \"\nparam_types = true\n").unwrap();
    assert_eq!(opts.indent, "    ");
    assert!(opts.prelude);
    assert!(opts.param_types);

    let opts: NetlistOptions = toml::from_str("").unwrap();
    assert_eq!(opts, NetlistOptions::default());
}

#[test]
fn write_netlist_to_file() {
    let dir = PathBuf::from(BUILD_DIR).join("write_netlist_to_file");
    let path = dir.join("chain.v");
    let _ = std::fs::remove_dir_all(&dir);

    let (lib, _) = inverter_chain();
    let conv = crate::export_verilog_to_file(&lib, &path).unwrap();
    assert_eq!(conv.modules.len(), 2);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, netlist_to_string(&lib, &NetlistOptions::default()).unwrap());
}

#[test]
fn failed_netlist_creates_no_file() {
    let dir = PathBuf::from(BUILD_DIR).join("failed_netlist_creates_no_file");
    let path = dir.join("bad.v");
    let _ = std::fs::remove_dir_all(&dir);

    let mut lib = Library::new("lib");
    lib.add_module(Module::new("a.inv"));
    lib.add_module(Module::new("b.inv"));
    let err = Verilog
        .write_netlist_to_file(&lib, &path, &NetlistOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateDefinition { .. }));
    assert!(!path.exists());

    let mut out = Vec::new();
    assert!(Verilog
        .write_netlist(&lib, &mut out, &NetlistOptions::default())
        .is_err());
    assert!(out.is_empty());
}

#[test]
fn colliding_identifiers_are_rejected() {
    let mut lib = Library::new("lib");
    let mut module = Module::new("collide");
    module.add_port(Port::new(Signal::wire("a.b"), Direction::Input));
    module.add_signal(Signal::wire("a_b"));
    let collide = lib.add_module(module);
    let opts = no_prelude();

    let mut netlister = NetlisterInstance::new(&lib, &opts);
    let err = netlister.write_module_definition(collide).unwrap_err();
    match &err {
        Error::DuplicateIdentifier {
            name,
            first,
            second,
            module,
        } => {
            assert_eq!(name, "a_b");
            assert_eq!(first, "a.b");
            assert_eq!(second, "a_b");
            assert_eq!(module, "collide");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(netlister.writer().as_str().is_empty());

    let mut lib = Library::new("lib");
    let leaf = lib.add_module(Module::new("leaf"));
    let mut top = Module::new("top");
    top.add_instance(Instance::new("u-1", leaf));
    top.add_instance(Instance::new("u_1", leaf));
    lib.add_module(top);
    let err = netlist_to_string(&lib, &opts).unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateIdentifier { ref first, ref second, .. } if first == "u-1" && second == "u_1"
    ));
}

#[test]
fn external_names_are_reserved() {
    let mut lib = Library::new("lib");
    let mut ext = ExternalModule::new("inv");
    ext.add_port(Port::new(Signal::wire("a"), Direction::Input));
    lib.add_external_module(ext);
    lib.add_module(inverter());

    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(err, Error::DuplicateDefinition { ref name } if name == "inv"));
}

#[test]
fn non_finite_doubles_are_rejected() {
    let err = get_param_value("x", &ParamValue::Double(f64::NAN), "m").unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameterValue { ref param, ref context, .. } if param == "x" && context == "m"
    ));

    let mut lib = Library::new("lib");
    let mut res = Module::new("res");
    res.add_param("R", Param::Double { default: Some(f64::INFINITY) });
    lib.add_module(res);
    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(err, Error::InvalidParameterValue { ref value, .. } if value == "inf"));
}

#[test]
fn empty_concats_are_rejected() {
    let mut lib = Library::new("lib");
    let inv = lib.add_module(inverter());
    let mut top = Module::new("top");
    top.add_signal(Signal::wire("x"));
    let mut inst = Instance::new("i0", inv);
    inst.connect("a", Connection::signal("x"));
    let empty = Connection::Concat(Concat::default());
    inst.connect("y", Connection::concat([Connection::signal("x"), empty]));
    top.add_instance(inst);
    lib.add_module(top);

    let err = netlist_to_string(&lib, &no_prelude()).unwrap_err();
    assert!(matches!(
        err,
        Error::EmptyConcat { ref port, ref instance, .. } if port == "y" && instance == "i0"
    ));
}

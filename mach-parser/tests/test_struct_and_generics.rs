use mach_ast::NodeKind;

fn parse_ok(source: &str) -> mach_ast::Ast {
    let (ast, diagnostics) = mach_parser::parse(source, "t.mach");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(ast.error_count(), 0);
    ast
}

#[test]
fn struct_fields_parse_in_declaration_order() {
    let ast = parse_ok("str S { a: u8; b: u32; c: u8; }\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    assert_eq!(items.len(), 1);

    let record = ast.get(items[0]);
    match &record.kind {
        NodeKind::RecordDecl { is_union, name, fields, .. } => {
            assert!(!is_union);
            assert_eq!(name, "S");
            let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        }
        other => panic!("expected RecordDecl, got {other:?}"),
    }
}

#[test]
fn union_fields_share_the_record_shape() {
    let ast = parse_ok("uni U { a: i32; b: f32; }\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    match &ast.get(items[0]).kind {
        NodeKind::RecordDecl { is_union, fields, .. } => {
            assert!(is_union);
            assert_eq!(fields.len(), 2);
        }
        other => panic!("expected RecordDecl, got {other:?}"),
    }
}

/// `id<i32>(3)` is a generic call, not `id < i32 > (3)` — the postfix
/// parser must speculatively commit to the `<...>` type-argument reading.
#[test]
fn generic_call_site_is_disambiguated_from_comparison() {
    let ast = parse_ok("fun main(): i32 {\n  ret id<i32>(3);\n}\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    let NodeKind::FunDecl { body, .. } = &ast.get(items[0]).kind else { panic!("expected FunDecl") };
    let NodeKind::Block { statements } = &ast.get(body.unwrap()).kind else { panic!("expected Block") };
    let NodeKind::Return { value } = &ast.get(statements[0]).kind else { panic!("expected Return") };
    match &ast.get(value.unwrap()).kind {
        NodeKind::Call { type_args, args, .. } => {
            assert_eq!(type_args.len(), 1);
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected Call, got {other:?}"),
    }
}

/// Without a following `(`, a bare `<` must fall back to the relational
/// operator rather than getting stuck mid-speculation.
#[test]
fn bare_less_than_is_not_mistaken_for_a_generic_call() {
    let ast = parse_ok("fun main(): i32 {\n  ret a < b;\n}\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    let NodeKind::FunDecl { body, .. } = &ast.get(items[0]).kind else { panic!("expected FunDecl") };
    let NodeKind::Block { statements } = &ast.get(body.unwrap()).kind else { panic!("expected Block") };
    let NodeKind::Return { value } = &ast.get(statements[0]).kind else { panic!("expected Return") };
    match &ast.get(value.unwrap()).kind {
        NodeKind::Infix { op, .. } => assert_eq!(*op, mach_ast::InfixOp::Lt),
        other => panic!("expected Infix(Lt), got {other:?}"),
    }
}

#[test]
fn pointer_array_and_function_types_parse() {
    let ast = parse_ok("def Handler: fun(?u8, []i32): ?i32;\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    let NodeKind::TypeAlias { target, .. } = &ast.get(items[0]).kind else { panic!("expected TypeAlias") };
    match &ast.get(*target).kind {
        NodeKind::TypeFunction { params, ret, variadic } => {
            assert_eq!(params.len(), 2);
            assert!(!variadic);
            assert!(ret.is_some());
        }
        other => panic!("expected TypeFunction, got {other:?}"),
    }
}

#[test]
fn if_or_chain_with_trailing_else_parses() {
    let ast = parse_ok(
        "fun main(): i32 {\n  if (1) { ret 1; } or (2) { ret 2; } or { ret 0; }\n}\n",
    );
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    let NodeKind::FunDecl { body, .. } = &ast.get(items[0]).kind else { panic!("expected FunDecl") };
    let NodeKind::Block { statements } = &ast.get(body.unwrap()).kind else { panic!("expected Block") };
    match &ast.get(statements[0]).kind {
        NodeKind::If { or_branches, .. } => {
            assert_eq!(or_branches.len(), 2);
            assert!(or_branches[0].0.is_some());
            assert!(or_branches[1].0.is_none());
        }
        other => panic!("expected If, got {other:?}"),
    }
}

#[test]
fn extern_block_collects_signature_only_functions() {
    let ast = parse_ok("ext \"C\" {\n  fun printf(fmt: ?u8, ...): i32;\n}\n");
    let root = ast.get(ast.root.unwrap());
    let NodeKind::Program { items } = &root.kind else { panic!("expected Program") };
    match &ast.get(items[0]).kind {
        NodeKind::ExternDecl { abi, functions } => {
            assert_eq!(abi, "C");
            assert_eq!(functions.len(), 1);
            let NodeKind::FunDecl { is_variadic, body, .. } = &ast.get(functions[0]).kind else {
                panic!("expected FunDecl")
            };
            assert!(is_variadic);
            assert!(body.is_none());
        }
        other => panic!("expected ExternDecl, got {other:?}"),
    }
}

use std::collections::{BTreeSet, HashMap};

use infra_forge_core::expression::Literal;
use infra_forge_core::{Diagnostic, DiagnosticKind, Span};
use infra_forge_dsl::{
    Declaration, Expression, ExpressionKind, Identifier, NodeId, Program, ResourceDeclaration,
    StringSegment, TypeAnnotation,
};

use super::cycles::find_cycles;
use super::namespaces::{ReturnType, NAMESPACES};
use super::scope::{Scope, ScopeId, ScopeKind};
use super::symbol::{
    ErrorSymbol, FunctionSymbol, NamespaceSymbol, OutputSymbol, ParameterSymbol, ResourceSymbol,
    Symbol, SymbolId, VariableSymbol,
};
use super::types::{DeclaredType, TypeKind};
use super::{lookup_in, SemanticModel};

/// Binds a parsed program into a semantic model.
///
/// Never fails: every problem becomes a diagnostic, and unresolved names bind
/// to error symbols so that later checks still run.
pub fn bind(program: Program) -> SemanticModel {
    let parts = Binder::new(&program).run();
    tracing::debug!(
        declarations = program.declarations.len(),
        symbols = parts.symbols.len(),
        diagnostics = parts.diagnostics.len(),
        cycles = parts.cycles.len(),
        "binding complete"
    );
    SemanticModel {
        program,
        scopes: parts.scopes,
        symbols: parts.symbols,
        global: parts.global,
        file: parts.file,
        imports: parts.imports,
        bindings: parts.bindings,
        declaration_symbols: parts.declaration_symbols,
        references: parts.references,
        declaration_types: parts.declaration_types,
        cycles: parts.cycles,
        diagnostics: parts.diagnostics,
    }
}

struct Parts {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    global: ScopeId,
    file: ScopeId,
    imports: Vec<ScopeId>,
    bindings: HashMap<NodeId, SymbolId>,
    declaration_symbols: Vec<Option<SymbolId>>,
    references: Vec<Vec<usize>>,
    declaration_types: Vec<TypeKind>,
    cycles: Vec<Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

/// Progress of lazy variable type inference.
#[derive(Clone, Copy)]
enum Inference {
    Pending,
    InProgress,
    Done(TypeKind),
}

struct Binder<'p> {
    program: &'p Program,
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    global: ScopeId,
    file: ScopeId,
    imports: Vec<ScopeId>,
    bindings: HashMap<NodeId, SymbolId>,
    declaration_symbols: Vec<Option<SymbolId>>,
    references: Vec<BTreeSet<usize>>,
    inferred: Vec<Inference>,
    diagnostics: Vec<Diagnostic>,
}

impl<'p> Binder<'p> {
    fn new(program: &'p Program) -> Self {
        let count = program.declarations.len();
        let mut binder = Self {
            program,
            scopes: Vec::new(),
            symbols: Vec::new(),
            global: ScopeId(0),
            file: ScopeId(0),
            imports: Vec::new(),
            bindings: HashMap::new(),
            declaration_symbols: vec![None; count],
            references: vec![BTreeSet::new(); count],
            inferred: vec![Inference::Pending; count],
            diagnostics: Vec::new(),
        };
        binder.global = binder.add_scope(ScopeKind::Global, None);
        for namespace in NAMESPACES {
            let scope = binder.add_scope(ScopeKind::Namespace(namespace.name), Some(binder.global));
            let symbol = binder.add_symbol(Symbol::Namespace(NamespaceSymbol {
                name: namespace.name,
                scope,
            }));
            // Namespace names are unique by construction.
            let _ = binder.scopes[binder.global.index()].insert(namespace.name, symbol);
            for signature in namespace.functions {
                let function = binder.add_symbol(Symbol::Function(FunctionSymbol {
                    signature,
                    namespace: scope,
                }));
                let _ = binder.scopes[scope.index()].insert(signature.name, function);
            }
            binder.imports.push(scope);
        }
        binder.file = binder.add_scope(ScopeKind::File, Some(binder.global));
        binder
    }

    fn run(mut self) -> Parts {
        let program = self.program;
        self.declare_all();
        for (index, declaration) in program.declarations.iter().enumerate() {
            if let Some(body) = declaration.body() {
                self.bind_expression(body, index);
            }
            if let Declaration::Resource(resource) = declaration {
                self.check_resource_body(resource);
            }
        }
        self.check_types();

        let references: Vec<Vec<usize>> = self
            .references
            .iter()
            .map(|set| set.iter().copied().collect())
            .collect();
        let cycles = find_cycles(&references);
        for cycle in &cycles {
            self.report_cycle(cycle);
        }

        let declaration_types = (0..self.program.declarations.len())
            .map(|index| self.declaration_type(index))
            .collect();

        let mut diagnostics = self.program.diagnostics.clone();
        diagnostics.append(&mut self.diagnostics);
        diagnostics.sort_by_key(|d| (d.line, d.column));

        Parts {
            scopes: self.scopes,
            symbols: self.symbols,
            global: self.global,
            file: self.file,
            imports: self.imports,
            bindings: self.bindings,
            declaration_symbols: self.declaration_symbols,
            references,
            declaration_types,
            cycles,
            diagnostics,
        }
    }

    fn add_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent));
        id
    }

    fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    fn lookup(&self, name: &str) -> Option<SymbolId> {
        lookup_in(&self.scopes, self.file, &self.imports, name)
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticKind::Binding,
            message,
            span,
            &self.program.line_index,
        ));
    }

    fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticKind::Binding,
            message,
            span,
            &self.program.line_index,
        ));
    }

    // -- Declarations --

    fn declare_all(&mut self) {
        let program = self.program;
        for (index, declaration) in program.declarations.iter().enumerate() {
            let symbol = match declaration {
                Declaration::Parameter(d) => Symbol::Parameter(ParameterSymbol {
                    name: d.name.name.clone(),
                    span: d.name.span,
                    declaration: index,
                    declared_type: self.resolve_type(&d.type_annotation),
                }),
                Declaration::Variable(d) => Symbol::Variable(VariableSymbol {
                    name: d.name.name.clone(),
                    span: d.name.span,
                    declaration: index,
                }),
                Declaration::Resource(d) => {
                    let resource_type = d
                        .resource_type
                        .split()
                        .map(|(full, version)| (full.to_string(), version.to_string()));
                    if resource_type.is_none() {
                        self.error(
                            format!(
                                "invalid resource type '{}'; expected '<provider>/<type>@<apiVersion>'",
                                d.resource_type.text
                            ),
                            d.resource_type.span,
                        );
                    }
                    Symbol::Resource(ResourceSymbol {
                        name: d.name.name.clone(),
                        span: d.name.span,
                        declaration: index,
                        resource_type,
                    })
                }
                Declaration::Output(d) => Symbol::Output(OutputSymbol {
                    name: d.name.name.clone(),
                    span: d.name.span,
                    declaration: index,
                    declared_type: d
                        .type_annotation
                        .as_ref()
                        .and_then(|annotation| self.resolve_type(annotation)),
                }),
                Declaration::Skipped(_) => continue,
            };

            let name = symbol.name().to_string();
            let span = symbol.span().unwrap_or_default();
            let id = self.add_symbol(symbol);
            self.declaration_symbols[index] = Some(id);
            if let Err(existing) = self.scopes[self.file.index()].insert(&name, id) {
                let first = self.symbols[existing.index()].kind_name();
                self.error(
                    format!("'{name}' is declared more than once; the first declaration is a {first}"),
                    span,
                );
            }
        }
    }

    fn resolve_type(&mut self, annotation: &TypeAnnotation) -> Option<DeclaredType> {
        let resolved = DeclaredType::from_dsl_name(&annotation.name);
        if resolved.is_none() {
            self.error(
                format!(
                    "unknown type '{}'; expected one of {}",
                    annotation.name,
                    DeclaredType::dsl_names()
                ),
                annotation.span,
            );
        }
        resolved
    }

    // -- References --

    fn bind_expression(&mut self, expression: &'p Expression, declaration: usize) {
        match &expression.kind {
            ExpressionKind::Reference(identifier) => {
                self.bind_reference(expression.id, identifier, declaration);
            }
            ExpressionKind::FunctionCall {
                namespace,
                name,
                arguments,
            } => {
                self.bind_call(expression.id, namespace.as_ref(), name, arguments.len());
                for argument in arguments {
                    self.bind_expression(argument, declaration);
                }
            }
            ExpressionKind::PropertyAccess { base, .. } => self.bind_expression(base, declaration),
            ExpressionKind::ArrayAccess { base, index } => {
                self.bind_expression(base, declaration);
                self.bind_expression(index, declaration);
            }
            ExpressionKind::Object(properties) => {
                for property in properties {
                    self.bind_expression(&property.value, declaration);
                }
            }
            ExpressionKind::Array(items) => {
                for item in items {
                    self.bind_expression(item, declaration);
                }
            }
            ExpressionKind::Interpolated(segments) => {
                for segment in segments {
                    if let StringSegment::Expression(inner) = segment {
                        self.bind_expression(inner, declaration);
                    }
                }
            }
            ExpressionKind::Literal(_) | ExpressionKind::Skipped => {}
        }
    }

    fn bind_reference(&mut self, node: NodeId, identifier: &Identifier, declaration: usize) {
        let name = &identifier.name;
        let Some(id) = self.lookup(name) else {
            self.error(format!("'{name}' is not declared"), identifier.span);
            let placeholder = self.add_symbol(Symbol::Error(ErrorSymbol { name: name.clone() }));
            self.bindings.insert(node, placeholder);
            return;
        };
        self.bindings.insert(node, id);

        let in_parameter = matches!(
            self.program.declarations[declaration],
            Declaration::Parameter(_)
        );
        match &self.symbols[id.index()] {
            Symbol::Parameter(s) => {
                self.references[declaration].insert(s.declaration);
            }
            Symbol::Variable(VariableSymbol { declaration: target, .. })
            | Symbol::Resource(ResourceSymbol { declaration: target, .. }) => {
                let target = *target;
                self.references[declaration].insert(target);
                if in_parameter {
                    self.error(
                        format!("parameter default values may only reference other parameters, not '{name}'"),
                        identifier.span,
                    );
                }
            }
            Symbol::Output(_) => {
                self.error(format!("output '{name}' cannot be referenced"), identifier.span);
            }
            Symbol::Function(_) => {
                self.error(
                    format!("'{name}' is a function; call it as {name}(...)"),
                    identifier.span,
                );
            }
            Symbol::Namespace(_) => {
                self.error(
                    format!("namespace '{name}' cannot be used as a value"),
                    identifier.span,
                );
            }
            Symbol::Error(_) => {}
        }
    }

    fn bind_call(
        &mut self,
        node: NodeId,
        namespace: Option<&Identifier>,
        name: &Identifier,
        argument_count: usize,
    ) {
        let resolved = match namespace {
            Some(qualifier) => match self.lookup(&qualifier.name) {
                Some(id) => match &self.symbols[id.index()] {
                    Symbol::Namespace(ns) => {
                        let found = self.scopes[ns.scope.index()].get(&name.name);
                        if found.is_none() {
                            self.error(
                                format!(
                                    "namespace '{}' has no function '{}'",
                                    qualifier.name, name.name
                                ),
                                name.span,
                            );
                        }
                        found
                    }
                    other => {
                        let kind = other.kind_name();
                        self.error(
                            format!("'{}' is a {kind}, not a namespace", qualifier.name),
                            qualifier.span,
                        );
                        None
                    }
                },
                None => {
                    self.error(
                        format!("'{}' is not a known namespace", qualifier.name),
                        qualifier.span,
                    );
                    None
                }
            },
            None => match self.lookup(&name.name) {
                Some(id) if self.symbols[id.index()].is_function() => Some(id),
                Some(id) => {
                    let kind = self.symbols[id.index()].kind_name();
                    self.error(
                        format!("'{}' is a {kind}, not a function", name.name),
                        name.span,
                    );
                    None
                }
                None => {
                    self.error(format!("'{}' is not a known function", name.name), name.span);
                    None
                }
            },
        };

        let Some(id) = resolved else {
            return;
        };
        self.bindings.insert(node, id);
        if let Symbol::Function(function) = &self.symbols[id.index()] {
            let signature = function.signature;
            if !signature.accepts(argument_count) {
                self.error(
                    format!(
                        "function '{}' expects {} argument(s) but was given {argument_count}",
                        signature.name,
                        signature.arity()
                    ),
                    name.span,
                );
            }
        }
    }

    fn check_resource_body(&mut self, resource: &'p ResourceDeclaration) {
        let body = &resource.body;
        let properties = match &body.kind {
            ExpressionKind::Object(properties) => properties,
            ExpressionKind::Skipped => return,
            _ => {
                self.error(
                    format!("the body of resource '{}' must be an object", resource.name.name),
                    body.span,
                );
                return;
            }
        };

        if body.property("name").is_none() {
            self.error(
                format!(
                    "resource '{}' is missing the required 'name' property",
                    resource.name.name
                ),
                resource.name.span,
            );
        }
        for property in properties {
            if property.key == "type" || property.key == "apiVersion" {
                self.error(
                    format!(
                        "'{}' is taken from the resource type header and cannot be set in the body",
                        property.key
                    ),
                    property.key_span,
                );
            }
        }

        let Some(depends_on) = body.property("dependsOn") else {
            return;
        };
        let ExpressionKind::Array(entries) = &depends_on.value.kind else {
            self.error(
                "'dependsOn' must be an array of resource references",
                depends_on.value.span,
            );
            return;
        };
        for entry in entries {
            let is_resource = matches!(entry.kind, ExpressionKind::Reference(_))
                && matches!(
                    self.bindings.get(&entry.id).map(|id| &self.symbols[id.index()]),
                    Some(Symbol::Resource(_) | Symbol::Error(_))
                );
            if !is_resource {
                self.error("'dependsOn' entries must be resource references", entry.span);
            }
        }
    }

    // -- Types --

    fn check_types(&mut self) {
        let program = self.program;
        self.infer_variables();
        for (index, declaration) in program.declarations.iter().enumerate() {
            match declaration {
                Declaration::Parameter(d) => {
                    let declared = self.declared_type_of(index);
                    if let (Some(declared), Some(default)) = (declared, &d.default_value) {
                        let actual = self.type_of(default);
                        if !actual.is_assignable_to(declared.kind()) {
                            self.error(
                                format!(
                                    "default value of type '{actual}' is not assignable to parameter type '{declared}'"
                                ),
                                default.span,
                            );
                        }
                    }
                }
                Declaration::Variable(_) => {
                    self.variable_type(index);
                }
                Declaration::Output(d) => {
                    let actual = self.type_of(&d.value);
                    match self.declared_type_of(index) {
                        Some(declared) if !actual.is_assignable_to(declared.kind()) => {
                            self.error(
                                format!(
                                    "value of type '{actual}' is not assignable to output type '{declared}'"
                                ),
                                d.value.span,
                            );
                        }
                        Some(_) => {}
                        None if d.type_annotation.is_none() && !actual.is_known() => {
                            self.warning(
                                format!(
                                    "the type of output '{}' cannot be inferred; it is emitted as 'object'",
                                    d.name.name
                                ),
                                d.name.span,
                            );
                        }
                        None => {}
                    }
                }
                Declaration::Resource(_) | Declaration::Skipped(_) => {}
            }
        }
    }

    fn declared_type_of(&self, index: usize) -> Option<DeclaredType> {
        match self.declaration_symbols[index].map(|id| &self.symbols[id.index()]) {
            Some(Symbol::Parameter(s)) => s.declared_type,
            Some(Symbol::Output(s)) => s.declared_type,
            _ => None,
        }
    }

    fn declaration_type(&mut self, index: usize) -> TypeKind {
        match &self.program.declarations[index] {
            Declaration::Parameter(_) => self
                .declared_type_of(index)
                .map_or(TypeKind::Error, DeclaredType::kind),
            Declaration::Variable(_) => self.variable_type(index),
            Declaration::Resource(_) => TypeKind::Object,
            Declaration::Output(d) => match (self.declared_type_of(index), &d.type_annotation) {
                (Some(declared), _) => declared.kind(),
                (None, Some(_)) => TypeKind::Error,
                (None, None) => self.type_of(&d.value),
            },
            Declaration::Skipped(_) => TypeKind::Error,
        }
    }

    /// Infers every variable after the variables it references, walking the
    /// reference graph with an explicit stack. Variables still on the stack
    /// are in progress, so a back edge reads as a cycle instead of recursing.
    fn infer_variables(&mut self) {
        let program = self.program;
        let is_variable =
            |index: usize| matches!(program.declarations[index], Declaration::Variable(_));
        let edges: Vec<Vec<usize>> = self
            .references
            .iter()
            .map(|targets| targets.iter().copied().filter(|&t| is_variable(t)).collect())
            .collect();

        for root in (0..program.declarations.len()).filter(|&i| is_variable(i)) {
            if !matches!(self.inferred[root], Inference::Pending) {
                continue;
            }
            self.inferred[root] = Inference::InProgress;
            let mut frames = vec![(root, 0usize)];
            while let Some(frame) = frames.last_mut() {
                let (node, edge) = *frame;
                if let Some(&target) = edges[node].get(edge) {
                    frame.1 += 1;
                    if matches!(self.inferred[target], Inference::Pending) {
                        self.inferred[target] = Inference::InProgress;
                        frames.push((target, 0));
                    }
                    continue;
                }
                frames.pop();
                let kind = match &program.declarations[node] {
                    Declaration::Variable(d) => self.type_of(&d.value),
                    _ => TypeKind::Error,
                };
                self.inferred[node] = Inference::Done(kind);
            }
        }
    }

    fn variable_type(&mut self, index: usize) -> TypeKind {
        match self.inferred[index] {
            Inference::Done(kind) => kind,
            // A cycle; reported separately.
            Inference::InProgress => TypeKind::Any,
            Inference::Pending => {
                self.inferred[index] = Inference::InProgress;
                let kind = match &self.program.declarations[index] {
                    Declaration::Variable(d) => self.type_of(&d.value),
                    _ => TypeKind::Error,
                };
                self.inferred[index] = Inference::Done(kind);
                kind
            }
        }
    }

    fn type_of(&mut self, expression: &Expression) -> TypeKind {
        match &expression.kind {
            ExpressionKind::Literal(literal) => match literal {
                Literal::String(_) => TypeKind::String,
                Literal::Integer(_) => TypeKind::Int,
                Literal::Boolean(_) => TypeKind::Bool,
                Literal::Null => TypeKind::Null,
            },
            ExpressionKind::Reference(_) => {
                match self.bindings.get(&expression.id).map(|id| &self.symbols[id.index()]) {
                    Some(Symbol::Parameter(s)) => {
                        s.declared_type.map_or(TypeKind::Error, DeclaredType::kind)
                    }
                    Some(Symbol::Variable(s)) => {
                        let declaration = s.declaration;
                        self.variable_type(declaration)
                    }
                    Some(Symbol::Resource(_)) => TypeKind::Object,
                    _ => TypeKind::Error,
                }
            }
            ExpressionKind::FunctionCall { arguments, .. } => {
                let returns = match self.bindings.get(&expression.id).map(|id| &self.symbols[id.index()]) {
                    Some(Symbol::Function(function)) => function.signature.returns,
                    _ => return TypeKind::Error,
                };
                match returns {
                    ReturnType::Fixed(kind) => kind,
                    ReturnType::Argument(position) => arguments
                        .get(position)
                        .map_or(TypeKind::Any, |argument| self.type_of(argument)),
                }
            }
            ExpressionKind::PropertyAccess { base, property } => {
                let on_resource = matches!(
                    self.bindings.get(&base.id).map(|id| &self.symbols[id.index()]),
                    Some(Symbol::Resource(_))
                ) && matches!(base.kind, ExpressionKind::Reference(_));
                match property.name.as_str() {
                    "id" | "name" | "type" | "apiVersion" if on_resource => TypeKind::String,
                    _ => TypeKind::Any,
                }
            }
            ExpressionKind::ArrayAccess { .. } => TypeKind::Any,
            ExpressionKind::Object(_) => TypeKind::Object,
            ExpressionKind::Array(_) => TypeKind::Array,
            ExpressionKind::Interpolated(_) => TypeKind::String,
            ExpressionKind::Skipped => TypeKind::Error,
        }
    }

    // -- Cycles --

    fn report_cycle(&mut self, cycle: &[usize]) {
        let names: Vec<String> = cycle
            .iter()
            .filter_map(|index| self.program.declarations[*index].name())
            .map(|identifier| format!("'{}'", identifier.name))
            .collect();
        let span = self.program.declarations[cycle[0]]
            .name()
            .map_or_else(|| self.program.declarations[cycle[0]].span(), |id| id.span);
        let message = match names.as_slice() {
            [single] => format!("{single} references itself"),
            _ => format!("reference cycle among {}", names.join(", ")),
        };
        self.error(message, span);
    }
}

#![allow(
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    reason = "benchmark"
)]

use std::{collections::HashMap, hint::black_box};

use criterion::{Criterion, criterion_group, criterion_main};
use stencil::{
    Conditional, Document, Extend, Loop, MemorySource, Operator,
    ParameterDeclaration as Decl, ParameterResolver, Renderer, RendererConfig, StencilError,
    StencilResult, Syntax, TagCall, TagRegistry, UserInfo,
};

mod utils;

fn layout() -> Vec<Syntax> {
    vec![
        Syntax::raw("<html><body>"),
        Syntax::import("body"),
        Syntax::raw("</body></html>"),
    ]
}

fn profile() -> Vec<Syntax> {
    let details = Decl::binary(
        Decl::variable("show_details"),
        Operator::And,
        Decl::variable("has_access"),
    );
    let item = Syntax::Loop(Loop {
        item: "item".to_string(),
        array: Decl::variable("items"),
        body: vec![
            Syntax::raw("<li>"),
            Syntax::variable("item.name"),
            Syntax::Conditional(Conditional::new(
                Decl::variable("item.special"),
                vec![Syntax::raw("*")],
            )),
            Syntax::raw(" = "),
            Syntax::variable("item.value"),
            Syntax::raw("</li>"),
        ],
    });

    vec![Syntax::Extend(Extend::new("layout").export(
        "body",
        vec![
            Syntax::raw("<h1>"),
            Syntax::Custom(TagCall::new("uppercased", vec![Decl::variable("user.name")])),
            Syntax::raw("</h1>"),
            Syntax::Conditional(
                Conditional::new(details, vec![Syntax::raw("Age: "), Syntax::variable("user.age")])
                    .otherwise(vec![Syntax::raw("Hidden")]),
            ),
            Syntax::raw("<ul>"),
            item,
            Syntax::raw("</ul>"),
        ],
    ))]
}

fn parse(name: &str, _raw: &[u8]) -> StencilResult<Vec<Syntax>> {
    match name {
        "layout" => Ok(layout()),
        "profile" => Ok(profile()),
        _ => Err(StencilError::NoTemplateExists {
            template_name: name.to_string(),
        }),
    }
}

fn stencil_benchmark(c: &mut Criterion) {
    let source: MemorySource = [("layout", ""), ("profile", "")].into_iter().collect();
    let renderer = Renderer::new(RendererConfig::default(), source, parse).unwrap();

    // Generate 100 random contexts
    let contexts = utils::generate_random_contexts(100);

    // Print binary size information
    utils::print_binary_size();

    let mut group = c.benchmark_group("Template Rendering");
    group.sample_size(50);

    group.bench_function("stencil_render", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(renderer.render("profile", context).unwrap());
            }
        });
    });

    group.bench_function("stencil_resolve", |b| {
        let mut base = Document::new("layout", layout());
        base.refresh();
        let externals = HashMap::from([("layout".to_string(), base)]);
        b.iter(|| {
            let mut document = Document::new("profile", profile());
            document.refresh();
            document.inline(&externals);
            black_box(document.is_flat());
        });
    });

    group.bench_function("stencil_evaluate", |b| {
        let tags = TagRegistry::default();
        let user_info = UserInfo::new();
        let expression = Decl::binary(
            Decl::binary(Decl::variable("user.age"), Operator::Plus, Decl::double(0.5)),
            Operator::GreaterThan,
            Decl::int(40),
        );
        b.iter(|| {
            for context in &contexts {
                let resolver = ParameterResolver::new(context, &tags, &user_info);
                black_box(resolver.resolve(&expression).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, stencil_benchmark);
criterion_main!(benches);

//! `interpose inspect`: show the proxy specification for a type.

use interpose_engine::proxy::{ProxyFactory, SpecSummary};
use interpose_engine::ProxyOptions;
use interpose_runtime::StrategyRegistry;

use crate::commands::resolve_type;
use crate::Format;

pub fn execute(type_name: &str, format: Format, options: ProxyOptions) -> anyhow::Result<()> {
    let class = resolve_type(type_name)?;
    let factory = ProxyFactory::new(options)?;
    let summary = factory.specification(&class)?.summary();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => {
            let strategy = StrategyRegistry::new().select(&class);
            print_text(&summary, &strategy.to_string());
        }
    }
    Ok(())
}

fn print_text(summary: &SpecSummary, strategy: &str) {
    println!("Type:         {}", summary.origin);
    println!("Proxy type:   {}", summary.unique_name);
    println!("Strategy:     {}", strategy);
    println!("Handler slot: {}", summary.handler_slot);
    match &summary.initializer {
        Some(init) => {
            let params: Vec<String> = init.params.iter().map(|p| p.to_string()).collect();
            println!("Initializer:  #{}({})", init.index, params.join(", "));
        }
        None => println!("Initializer:  none"),
    }

    println!();
    println!("Operations ({}):", summary.operations.len());
    for op in &summary.operations {
        let params: Vec<String> = op.params.iter().map(|p| p.to_string()).collect();
        let mut line = format!(
            "  {} {}({}{}) -> {}",
            op.visibility.keyword(),
            op.name,
            params.join(", "),
            if op.variadic { " ..." } else { "" },
            op.return_type
        );
        if !op.throws.is_empty() {
            line.push_str(&format!(" throws {}", op.throws.join(", ")));
        }
        println!("{}  [{}]", line, op.declared_in);
    }

    println!();
    println!("Dependencies: {}", summary.dependencies.join(", "));
}

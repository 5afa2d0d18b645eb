//! `interpose render`: print, and optionally compile, the proxy descriptor for a type.

use anyhow::Context;
use interpose_engine::{CompilationService, InProcessCompiler, ProxyFactory, ProxyOptions};

use crate::commands::resolve_type;

pub fn execute(type_name: &str, check: bool, options: ProxyOptions) -> anyhow::Result<()> {
    let class = resolve_type(type_name)?;
    let factory = ProxyFactory::new(options)?;
    let unit = factory.render(&class)?;
    print!("{}", unit.source);

    if check {
        let generated = InProcessCompiler::with_builtins()
            .compile(&unit.unique_name, &unit)
            .with_context(|| format!("descriptor for {} does not compile", class.name()))?;
        eprintln!(
            "compiled {} ({} operations)",
            generated.name(),
            generated.declared_methods().len()
        );
    }
    Ok(())
}

//! `interpose types`: list the built-in types.

use interpose_engine::builtins;
use interpose_engine::proxy::InterfaceProxyBuilder;

pub fn execute() -> anyhow::Result<()> {
    for class in builtins::all() {
        let parent = class.parent().map(|p| p.name().to_string());
        let interfaces: Vec<String> = InterfaceProxyBuilder::interfaces_of(&class)
            .iter()
            .map(|i| i.name.clone())
            .collect();

        print!("{}", class.name());
        if let Some(parent) = parent {
            print!(" extends {}", parent);
        }
        if !interfaces.is_empty() {
            print!(" implements {}", interfaces.join(", "));
        }
        println!();
    }
    Ok(())
}

use serde_json::Value;

use crate::front_end::error::FixtureError;
use crate::front_end::symbol::{ScopeId, SymbolTable};

// One symbol in a symbol table fixture
#[derive(Deserialize)]
struct SymbolFixture {
    symbol: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    namespace: Vec<SymbolFixture>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Many(Vec<SymbolFixture>),
    One(SymbolFixture),
}

// Builds a symbol table from fixture text, e.g.
//
//   {"symbol": "Foo", "attributes": {"kind": "module"}, "namespace": [{"symbol": "bar"}]}
//
// A list of such mappings defines several symbols in the root scope. Global ids are resolved
// once the table is built.
pub fn load_symbol_table(text: &str) -> Result<SymbolTable, FixtureError> {
    load_symbol_table_with(text, |_, value| value)
}

// Same as load_symbol_table, with every attribute value passed through attribute_fn so the
// caller can turn plain values into something more specific to its grammar
pub fn load_symbol_table_with<F>(text: &str, attribute_fn: F) -> Result<SymbolTable, FixtureError>
where
    F: Fn(&str, Value) -> Value,
{
    let fixture: Fixture = serde_json::from_str(text)?;
    let symbols = match fixture {
        Fixture::Many(symbols) => symbols,
        Fixture::One(symbol) => vec![symbol],
    };

    let mut table = SymbolTable::new();
    let root = table.root();
    for symbol in symbols {
        add_symbol(&mut table, root, symbol, &attribute_fn)?;
    }

    table.resolve_global_ids();
    Ok(table)
}

fn add_symbol<F>(table: &mut SymbolTable, scope: ScopeId, fixture: SymbolFixture, attribute_fn: &F) -> Result<(), FixtureError>
where
    F: Fn(&str, Value) -> Value,
{
    let name = fixture.symbol.ok_or(FixtureError::UnnamedSymbol)?;
    let id = table.add(scope, &name)?;

    for (key, value) in fixture.attributes {
        let value = attribute_fn(&key, value);
        table.set_attribute(id, &key, value);
    }

    let namespace = table.symbol(id).namespace();
    for child in fixture.namespace {
        add_symbol(table, namespace, child, attribute_fn)?;
    }
    Ok(())
}

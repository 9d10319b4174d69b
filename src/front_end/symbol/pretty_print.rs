use crate::front_end::symbol::{ScopeId, SymbolId, SymbolTable};

const INDENT: &str = "  ";

impl SymbolTable {
    // Pretty prints the whole table
    pub fn pprint(&self) {
        println!("{}", self.spprint().join("\n"));
    }

    // Pretty prints the whole table into a list of lines
    pub fn spprint(&self) -> Vec<String> {
        self.spprint_scope(self.root(), 0)
    }

    // Lines for every symbol of the scope by ascending local id, each followed by its namespace
    pub fn spprint_scope(&self, scope: ScopeId, indent: usize) -> Vec<String> {
        self.scope(scope)
            .symbols()
            .iter()
            .flat_map(|id| self.spprint_symbol(*id, indent))
            .collect()
    }

    fn spprint_symbol(&self, id: SymbolId, indent: usize) -> Vec<String> {
        let sym = self.symbol(id);
        let out_prefix = INDENT.repeat(indent);
        let in_prefix = INDENT.repeat(indent + 1);

        let mut ret = vec![
            format!("{}{{", out_prefix),
            format!("{}name:{:?}", in_prefix, sym.name()),
            format!("{}local id:{}", in_prefix, sym.local_id()),
        ];
        match sym.global_id() {
            Some(global_id) => ret.push(format!("{}global id:{}", in_prefix, global_id)),
            None => ret.push(format!("{}global id:unresolved", in_prefix)),
        }

        // Attributes are kept sorted by key
        if !sym.attributes.is_empty() {
            ret.push(format!("{}attributes:", in_prefix));
            ret.push(format!("{}(", in_prefix));
            for (key, value) in &sym.attributes {
                ret.push(format!("{}{}{:?}:{}", in_prefix, INDENT, key, value));
            }
            ret.push(format!("{})", in_prefix));
        }

        if !self.scope(sym.namespace()).is_empty() {
            ret.push(format!("{}namespace:", in_prefix));
            ret.push(format!("{}[", in_prefix));
            ret.extend(self.spprint_scope(sym.namespace(), indent + 2));
            ret.push(format!("{}]", in_prefix));
        }

        ret.push(format!("{}}},", out_prefix));
        ret
    }
}

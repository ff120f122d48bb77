// Directive keywords and operator symbols for the minimal demonstration
// spec bundle exercised by the integration tests. Real dialects are a
// caller concern (see `spec::Registry`); this is only enough
// configuration to keep that bundle's literal strings out of the test
// file's logic.

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Directives {
    pub define: String,
    pub declare: String,
    pub if_: String,
    pub ifdef: String,
    pub ifndef: String,
    pub elif: String,
    pub else_: String,
    pub endif: String,
    pub for_: String,
    pub endfor: String,
    pub import: String,
}

impl Default for Directives {
    fn default() -> Directives {
        Directives {
            define: "#define".to_string(),
            declare: "#declare".to_string(),
            if_: "#if".to_string(),
            ifdef: "#ifdef".to_string(),
            ifndef: "#ifndef".to_string(),
            elif: "#elif".to_string(),
            else_: "#else".to_string(),
            endif: "#endif".to_string(),
            for_: "#for".to_string(),
            endfor: "#endfor".to_string(),
            import: "#import".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Operators {
    pub sum: String,
    pub product: String,
    pub sub: String,
    pub div: String,
    pub modulus: String,
}

impl Default for Operators {
    fn default() -> Operators {
        Operators {
            sum: "+".to_string(),
            product: "*".to_string(),
            sub: "-".to_string(),
            div: "/".to_string(),
            modulus: "%".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DialectConfig {
    pub directives: Directives,
    pub operators: Operators,
}

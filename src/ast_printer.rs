use crate::ast::{Expr, FunctionDecl, FunctionLiteral, LiteralValue, Stmt};

/// Renders an AST back to parenthesized source text. The output of
/// `print_expr` re-parses to an expression with the same evaluation result,
/// which is what makes it usable in tests; it is not a pretty-printer.
pub fn print_expr(expression: &Expr) -> String {
    match expression {
        Expr::Literal(literal) => print_literal(literal),
        Expr::Grouping { expression } => format!("({})", print_expr(expression)),
        Expr::Unary { operator, right } => {
            format!("({}{})", operator.lexeme, print_expr(right))
        }
        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => format!(
            "({} {} {})",
            print_expr(left),
            operator.lexeme,
            print_expr(right)
        ),
        Expr::Variable { name, .. } => name.lexeme.clone(),
        Expr::Assign { name, value, .. } => {
            format!("({} = {})", name.lexeme, print_expr(value))
        }
        Expr::Call {
            callee, arguments, ..
        } => {
            let arguments: Vec<String> = arguments.iter().map(print_expr).collect();
            format!("{}({})", print_expr(callee), arguments.join(", "))
        }
        Expr::Get { object, name } => format!("{}.{}", print_expr(object), name.lexeme),
        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "({}.{} = {})",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),
        Expr::This { .. } => String::from("this"),
        Expr::Super { method, .. } => format!("super.{}", method.lexeme),
        Expr::Function(function) => format!("fun {}", print_function(function)),
    }
}

pub fn print_stmt(statement: &Stmt) -> String {
    match statement {
        Stmt::Expression { expression } => format!("{};", print_expr(expression)),
        Stmt::Print { expression } => format!("print {};", print_expr(expression)),
        Stmt::Var { name, initializer } => match initializer {
            Some(initializer) => format!("var {} = {};", name.lexeme, print_expr(initializer)),
            None => format!("var {};", name.lexeme),
        },
        Stmt::Block { statements } => format!("{{ {} }}", print_stmts(statements)),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let rendered = format!(
                "if ({}) {}",
                print_expr(condition),
                print_stmt(then_branch)
            );
            match else_branch {
                Some(else_branch) => format!("{} else {}", rendered, print_stmt(else_branch)),
                None => rendered,
            }
        }
        Stmt::While { condition, body } => {
            format!("while ({}) {}", print_expr(condition), print_stmt(body))
        }
        Stmt::Break => String::from("break;"),
        Stmt::Return { value, .. } => match value {
            Some(value) => format!("return {};", print_expr(value)),
            None => String::from("return;"),
        },
        Stmt::Function(FunctionDecl { name, function }) => {
            format!("fun {} {}", name.lexeme, print_function(function))
        }
        Stmt::Class {
            name,
            superclass,
            methods,
        } => {
            let header = match superclass {
                Some(superclass) => format!("class {} < {}", name.lexeme, print_expr(superclass)),
                None => format!("class {}", name.lexeme),
            };
            let methods: Vec<String> = methods
                .iter()
                .map(|method| format!("{} {}", method.name.lexeme, print_function(&method.function)))
                .collect();
            format!("{} {{ {} }}", header, methods.join(" "))
        }
    }
}

fn print_function(function: &FunctionLiteral) -> String {
    let params: Vec<&str> = function
        .params
        .iter()
        .map(|param| param.lexeme.as_str())
        .collect();
    format!("({}) {{ {} }}", params.join(", "), print_stmts(&function.body))
}

fn print_stmts(statements: &[Stmt]) -> String {
    let statements: Vec<String> = statements.iter().map(print_stmt).collect();
    statements.join(" ")
}

fn print_literal(literal: &LiteralValue) -> String {
    match literal {
        LiteralValue::Nil => String::from("nil"),
        LiteralValue::Boolean(value) => value.to_string(),
        LiteralValue::Number(value) => value.to_string(),
        LiteralValue::String(value) => format!("\"{}\"", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse_expr(source: &str) -> Expr {
        let tokens = Scanner::new(source).scan_tokens();
        let mut parser = Parser::new(&tokens);
        let statements = parser.parse();
        assert_eq!(parser.get_num_of_parser_errors(), 0, "parse failed");
        match statements.into_iter().next() {
            Some(Stmt::Expression { expression }) => expression,
            _ => panic!("expected a single expression statement"),
        }
    }

    #[test]
    fn renders_nested_arithmetic() {
        let expr = parse_expr("(-50) * 23.133;");
        assert_eq!(print_expr(&expr), "(((-50)) * 23.133)");
    }

    #[test]
    fn renders_calls_and_properties() {
        let expr = parse_expr("obj.method(1, \"two\");");
        assert_eq!(print_expr(&expr), "obj.method(1, \"two\")");
    }

    #[test]
    fn printed_expression_reparses() {
        let expr = parse_expr("1 + 2 * 3 - 4 / 2;");
        let reparsed = parse_expr(&format!("{};", print_expr(&expr)));
        // Same shape again after the round trip.
        assert_eq!(print_expr(&reparsed), print_expr(&expr));
    }
}

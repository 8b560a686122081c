use chumsky::{prelude::*, regex::regex};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // INSERT key value
    Insert(String, String),

    // DELETE key
    Delete(String),

    // GET key
    Get(String),

    // TRAVERSE
    Traverse,

    // DUMP
    Dump,

    // STATS
    Stats,

    // CHECK
    Check,

    // GRAPH 'file_path'?
    Graph(Option<String>),

    // LOAD 'file_path'
    Load(String),

    // SAVE 'file_path'
    Save(String),

    // RESET order?
    Reset(Option<usize>),

    Annotation(String),
    Null,
}

/// Drop the backslash in front of every escaped character
fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// Case-insensitive command word that must not run into the next word
fn keyword<'a>(word: &'static str) -> impl Parser<'a, &'a str, &'a str, extra::Err<Rich<'a, char>>> {
    regex(&format!(r"(?i){word}\b")).padded()
}

/// Single-quoted string with `\'` escapes, or a bare word
fn argument<'a>() -> impl Parser<'a, &'a str, String, extra::Err<Rich<'a, char>>> {
    let quoted = regex(r#"'([^'\\]|\\.)*'"#).map(|s: &str| unescape(&s[1..s.len() - 1]));
    let bare = regex(r"[^\s;']+").map(|s: &str| s.to_string());

    quoted.or(bare).padded()
}

pub fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Command>, extra::Err<Rich<'a, char>>> {
    let insert = keyword("INSERT")
        .ignore_then(argument())
        .then(argument())
        .map(|(key, value)| Command::Insert(key, value));

    let delete = keyword("DELETE")
        .ignore_then(argument())
        .map(Command::Delete);

    let get = keyword("GET").ignore_then(argument()).map(Command::Get);

    let traverse = keyword("TRAVERSE").to(Command::Traverse);
    let dump = keyword("DUMP").to(Command::Dump);
    let stats = keyword("STATS").to(Command::Stats);
    let check = keyword("CHECK").to(Command::Check);

    let graph = keyword("GRAPH")
        .ignore_then(argument().or_not())
        .map(Command::Graph);

    let load = keyword("LOAD").ignore_then(argument()).map(Command::Load);
    let save = keyword("SAVE").ignore_then(argument()).map(Command::Save);

    let reset = keyword("RESET")
        .ignore_then(
            regex(r"\d+")
                .try_map(|s: &str, span| {
                    s.parse::<usize>()
                        .map_err(|e| Rich::custom(span, format!("invalid order {s}: {e}")))
                })
                .padded()
                .or_not(),
        )
        .map(Command::Reset);

    let annotation = just("--")
        .ignore_then(none_of(";").repeated().to_slice())
        .map(|s: &str| Command::Annotation(s.trim().to_string()));

    let null_statement = just("").to(Command::Null);

    choice((
        insert,
        delete,
        get,
        traverse,
        dump,
        stats,
        check,
        graph,
        load,
        save,
        reset,
        annotation,
        null_statement,
    ))
    .then_ignore(just(';'))
    .padded()
    .repeated()
    .collect()
}

pub fn parse(input: &str) -> Result<Vec<Command>, String> {
    parser().parse(input).into_result().map_err(|errs| {
        errs.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_commands() {
        let input = "INSERT apple red; GET apple; DELETE apple;";
        let commands = parse(input).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Insert("apple".into(), "red".into()),
                Command::Get("apple".into()),
                Command::Delete("apple".into()),
            ]
        );
    }

    #[test]
    fn test_bare_commands() {
        let input = "TRAVERSE; DUMP; STATS; CHECK; GRAPH; RESET;";
        let commands = parse(input).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Traverse,
                Command::Dump,
                Command::Stats,
                Command::Check,
                Command::Graph(None),
                Command::Reset(None),
            ]
        );
    }

    #[test]
    fn test_lowercase_keywords() {
        let commands = parse("insert k v; traverse;").unwrap();
        assert_eq!(
            commands,
            vec![Command::Insert("k".into(), "v".into()), Command::Traverse]
        );
    }

    #[test]
    fn test_quoted_arguments() {
        let input = r"INSERT 'two words' 'it\'s'; GRAPH 'out dir/tree.dot'; LOAD 'data.csv'; SAVE x.csv;";
        let commands = parse(input).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Insert("two words".into(), "it's".into()),
                Command::Graph(Some("out dir/tree.dot".into())),
                Command::Load("data.csv".into()),
                Command::Save("x.csv".into()),
            ]
        );
    }

    #[test]
    fn test_empty_quoted_value() {
        let commands = parse("INSERT k '';").unwrap();
        assert_eq!(commands, vec![Command::Insert("k".into(), "".into())]);
    }

    #[test]
    fn test_reset_with_order() {
        let commands = parse("RESET 7;").unwrap();
        assert_eq!(commands, vec![Command::Reset(Some(7))]);
    }

    #[test]
    fn test_annotation_and_null() {
        let input = "-- load the fixture;
INSERT 1 one; ;
        ";
        let commands = parse(input).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Annotation("load the fixture".into()),
                Command::Insert("1".into(), "one".into()),
                Command::Null,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("INSERT onlykey;").is_err());
        assert!(parse("GET;").is_err());
        assert!(parse("TRAVERSE").is_err());
        assert!(parse("INSERTX a b;").is_err());
        assert!(parse("FROBNICATE;").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape(r"\'x\'"), "'x'");
        assert_eq!(unescape("plain"), "plain");
    }
}

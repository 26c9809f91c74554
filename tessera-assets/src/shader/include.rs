//! Recursive `#include` resolution against a virtual shader root. Cycles are broken by
//! skipping an include already open in the current resolution chain, rather than erroring;
//! an include seen earlier but outside the current chain is skipped too, since its text was
//! already folded in once and a second textual copy would duplicate symbol definitions.

use crate::error::Status;
use std::collections::HashSet;

/// One distinct file pulled in during resolution, recorded in first-seen order. The set of
/// these (path plus content) is what the shader builder folds into its cache key.
#[derive(Clone)]
pub struct ResolvedInclude {
    pub path: String,
    pub content: String,
}

/// Reads shader source by virtual path. Implemented by whatever backs the shader root: an
/// `AssetPak`, a directory, an embedded table.
pub trait ShaderSourceRoot: Send + Sync {
    fn read_source(&self, path: &str) -> Result<String, Status>;
}

/// Expands every `#include "path"` directive in `source`, starting at `entry_path`, and
/// returns the fully expanded text plus every distinct included path, in first-seen order.
pub fn resolve_includes(
    root: &dyn ShaderSourceRoot,
    entry_path: &str,
    source: &str,
) -> Result<(String, Vec<ResolvedInclude>), Status> {
    let mut seen = HashSet::new();
    let mut chain = HashSet::new();
    let mut includes = Vec::new();
    let expanded = expand(root, entry_path, source, &mut seen, &mut chain, &mut includes)?;
    Ok((expanded, includes))
}

fn expand(
    root: &dyn ShaderSourceRoot,
    path: &str,
    source: &str,
    seen: &mut HashSet<String>,
    chain: &mut HashSet<String>,
    includes: &mut Vec<ResolvedInclude>,
) -> Result<String, Status> {
    chain.insert(path.to_owned());
    let mut out = String::with_capacity(source.len());

    for line in source.lines() {
        match parse_include(line) {
            Some(included_path) if chain.contains(&included_path) => {
                // Cycle: treat as if the include were empty.
            }
            Some(included_path) if !seen.insert(included_path.clone()) => {
                // Already folded in elsewhere in this resolution; don't duplicate it.
            }
            Some(included_path) => {
                let included_source = root.read_source(&included_path)?;
                let included_expanded =
                    expand(root, &included_path, &included_source, seen, chain, includes)?;
                includes.push(ResolvedInclude {
                    path: included_path,
                    content: included_source,
                });
                out.push_str(&included_expanded);
                out.push('\n');
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    chain.remove(path);
    Ok(out)
}

fn parse_include(line: &str) -> Option<String> {
    let line = line.trim();
    let rest = line.strip_prefix("#include")?.trim();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    struct TableRoot(HashMap<&'static str, &'static str>);

    impl ShaderSourceRoot for TableRoot {
        fn read_source(&self, path: &str) -> Result<String, Status> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or(Status::NotFound)
        }
    }

    #[test]
    fn expands_a_simple_include() {
        let root = TableRoot(HashMap::from([("common.glsl", "float PI = 3.14;")]));
        let (expanded, includes) =
            resolve_includes(&root, "main.glsl", "#include \"common.glsl\"\nvoid main() {}")
                .unwrap();
        assert!(expanded.contains("PI = 3.14"));
        assert!(expanded.contains("void main()"));
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].path, "common.glsl");
    }

    #[test]
    fn breaks_a_cycle_without_erroring() {
        let root = TableRoot(HashMap::from([
            ("a.glsl", "#include \"b.glsl\"\nA"),
            ("b.glsl", "#include \"a.glsl\"\nB"),
        ]));
        let (expanded, includes) = resolve_includes(&root, "a.glsl", "#include \"b.glsl\"\nA")
            .unwrap();
        assert!(expanded.contains('A'));
        assert!(expanded.contains('B'));
        assert_eq!(includes.len(), 1);
    }

    #[test]
    fn diamond_include_is_folded_in_once() {
        let root = TableRoot(HashMap::from([
            ("left.glsl", "#include \"common.glsl\"\nLEFT"),
            ("right.glsl", "#include \"common.glsl\"\nRIGHT"),
            ("common.glsl", "COMMON"),
        ]));
        let source = "#include \"left.glsl\"\n#include \"right.glsl\"\n";
        let (expanded, includes) = resolve_includes(&root, "main.glsl", source).unwrap();
        assert_eq!(expanded.matches("COMMON").count(), 1);
        assert_eq!(includes.iter().filter(|i| i.path == "common.glsl").count(), 1);
    }

    #[test]
    fn missing_include_surfaces_not_found() {
        let root = TableRoot(HashMap::new());
        let err = resolve_includes(&root, "main.glsl", "#include \"missing.glsl\"\n").unwrap_err();
        assert_eq!(err, Status::NotFound);
    }
}

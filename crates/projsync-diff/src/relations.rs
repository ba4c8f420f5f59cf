//! Side-aware diff of relations
//!
//! Relations observed by the API and relations recorded only in the manifest
//! come from independent sources, so each side is compared on its own. A
//! relation counts as changed only within the side where it differs.

use projsync_model::{Relation, RelationSide, Relations};

/// Difference of one relation side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideDiff<'a> {
    pub side: RelationSide,
    pub only_in_remote: Vec<&'a Relation>,
    pub only_in_local: Vec<&'a Relation>,
}

/// Compare relations side by side, returning only the sides that differ
pub fn diff_relations<'a>(remote: &'a Relations, local: &'a Relations) -> Vec<SideDiff<'a>> {
    RelationSide::ALL
        .iter()
        .filter_map(|&side| {
            let r = remote.on_side(side);
            let l = local.on_side(side);
            let only_in_remote: Vec<_> = r.iter().filter(|x| !l.contains(*x)).copied().collect();
            let only_in_local: Vec<_> = l.iter().filter(|x| !r.contains(*x)).copied().collect();
            if only_in_remote.is_empty() && only_in_local.is_empty() {
                None
            } else {
                Some(SideDiff {
                    side,
                    only_in_remote,
                    only_in_local,
                })
            }
        })
        .collect()
}

/// Render side diffs as indented text
pub fn format_side_diffs(diffs: &[SideDiff<'_>]) -> String {
    let mut out = Vec::new();
    for diff in diffs {
        out.push(format!("{}:", diff.side));
        out.extend(diff.only_in_remote.iter().map(|r| format!("  - {r}")));
        out.extend(diff.only_in_local.iter().map(|r| format!("  + {r}")));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use projsync_model::{ComponentId, ConfigId, RowId};
    use pretty_assertions::assert_eq;

    fn variables_from(id: &str) -> Relation {
        Relation::VariablesFrom {
            variables_id: ConfigId::new(id),
        }
    }

    fn variables_for(id: &str) -> Relation {
        Relation::VariablesFor {
            component_id: ComponentId::new("keboola.ex-db"),
            config_id: ConfigId::new(id),
        }
    }

    #[test]
    fn test_same_relations_in_other_order() {
        let remote: Relations = [variables_from("1"), variables_for("2")].into_iter().collect();
        let local: Relations = [variables_for("2"), variables_from("1")].into_iter().collect();
        assert!(diff_relations(&remote, &local).is_empty());
    }

    #[test]
    fn test_change_only_on_manifest_side() {
        let remote: Relations = [variables_from("1")].into_iter().collect();
        let local: Relations = [variables_from("1"), variables_for("2")].into_iter().collect();

        let diffs = diff_relations(&remote, &local);

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].side, RelationSide::Manifest);
        assert!(diffs[0].only_in_remote.is_empty());
        assert_eq!(diffs[0].only_in_local, vec![&variables_for("2")]);
    }

    #[test]
    fn test_format() {
        let remote: Relations = [Relation::VariablesValuesFrom {
            values_id: RowId::new("10"),
        }]
        .into_iter()
        .collect();
        let local: Relations = [Relation::VariablesValuesFrom {
            values_id: RowId::new("11"),
        }]
        .into_iter()
        .collect();

        let text = format_side_diffs(&diff_relations(&remote, &local));

        assert_eq!(
            text,
            "in_api:\n  - variables values from \"10\"\n  + variables values from \"11\""
        );
    }
}

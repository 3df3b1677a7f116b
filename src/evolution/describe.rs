use super::variants::RegionalTag;
use super::{EvolutionDetail, Gender, LevelUp, RelativeStats};

/// Condition text for one edge: `(a or b)`, a single `(a)`, or empty.
///
/// When an edge lists both a friendship/affection clause and a level
/// clause, only the level clause is kept.
pub fn describe(details: &[EvolutionDetail]) -> String {
    let mut clauses: Vec<String> = Vec::new();
    for detail in details {
        if let Some(text) = clause(detail) {
            if !clauses.contains(&text) {
                clauses.push(text);
            }
        }
    }
    if let Some(level) = level_over_friendship(&clauses) {
        return join_alternatives(&[level]);
    }
    join_alternatives(&clauses)
}

pub fn clause(detail: &EvolutionDetail) -> Option<String> {
    let text = match detail {
        EvolutionDetail::LevelUp(level_up) => level_up_clause(level_up),
        EvolutionDetail::UseItem { item } => format!("Use {}", title_case(item.as_deref()?)),
        EvolutionDetail::Trade {
            held_item,
            trade_species,
        } => match (held_item, trade_species) {
            (Some(item), _) => format!("Trade holding {}", title_case(item)),
            (None, Some(species)) => format!("Trade for {}", title_case(species)),
            (None, None) => "Trade".to_string(),
        },
        EvolutionDetail::Shed => "Level 20, empty slot".to_string(),
        EvolutionDetail::Spin => "Spin with Sweet".to_string(),
        EvolutionDetail::TowerOfDarkness => "Tower of Darkness".to_string(),
        EvolutionDetail::TowerOfWaters => "Tower of Waters".to_string(),
        EvolutionDetail::ThreeCriticalHits => "3 critical hits".to_string(),
        EvolutionDetail::TakeDamage => "Take 49+ damage".to_string(),
        EvolutionDetail::AgileStyleMove => "Agile Style 20x".to_string(),
        EvolutionDetail::StrongStyleMove => "Strong Style 20x".to_string(),
        EvolutionDetail::RecoilDamage => "294+ recoil damage".to_string(),
        EvolutionDetail::Other { name } => {
            tracing::debug!(trigger = %name, "no description for evolution trigger");
            return None;
        }
    };
    Some(text)
}

fn level_up_clause(detail: &LevelUp) -> String {
    let at_time = |text: String| match &detail.time_of_day {
        Some(time) => format!("{text} at {time}"),
        None => text,
    };

    let mut text = if let Some(level) = detail.min_level {
        at_time(format!("Level {level}"))
    } else if detail.min_happiness.is_some() {
        at_time("High Friendship".to_string())
    } else if detail.min_affection.is_some() {
        match (&detail.known_move_type, &detail.known_move) {
            (Some(move_type), _) => format!("High Affection + {} move", title_case(move_type)),
            (None, Some(known_move)) => format!("High Affection + {}", title_case(known_move)),
            (None, None) => "High Affection".to_string(),
        }
    } else if let Some(beauty) = detail.min_beauty {
        format!("Beauty {beauty}+")
    } else if let Some(time) = &detail.time_of_day {
        format!("Level up at {time}")
    } else if let Some(location) = &detail.location {
        format!("Near {}", title_case(location))
    } else if let Some(known_move) = &detail.known_move {
        format!("Level up with {}", title_case(known_move))
    } else if let Some(move_type) = &detail.known_move_type {
        format!("Level up with {} move", title_case(move_type))
    } else if detail.needs_overworld_rain {
        "Level up during rain".to_string()
    } else if detail.turn_upside_down {
        "Turn upside down".to_string()
    } else {
        "Level up".to_string()
    };

    match detail.gender {
        Some(Gender::Female) => text.push_str(", Female"),
        Some(Gender::Male) => text.push_str(", Male"),
        None => {}
    }
    match detail.relative_physical_stats {
        Some(RelativeStats::AttackHigher) => text.push_str(", Atk > Def"),
        Some(RelativeStats::DefenseHigher) => text.push_str(", Def > Atk"),
        Some(RelativeStats::Equal) => text.push_str(", Atk = Def"),
        None => {}
    }
    if let Some(species) = &detail.party_species {
        text.push_str(&format!(", with {}", title_case(species)));
    }
    if let Some(party_type) = &detail.party_type {
        text.push_str(&format!(", with {} type", title_case(party_type)));
    }
    text
}

pub fn join_alternatives(clauses: &[String]) -> String {
    if clauses.is_empty() {
        return String::new();
    }
    format!("({})", clauses.join(" or "))
}

/// Inverse of [`join_alternatives`].
pub fn split_alternatives(text: &str) -> Vec<String> {
    strip_parens(text)
        .split(" or ")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn strip_parens(text: &str) -> &str {
    let text = text.strip_prefix('(').unwrap_or(text);
    text.strip_suffix(')').unwrap_or(text)
}

/// Union of the alternatives of two condition strings for the same edge.
pub fn merge_conditions(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() || left == right {
        return left.to_string();
    }
    let mut options: Vec<String> = Vec::new();
    for part in split_alternatives(left)
        .into_iter()
        .chain(split_alternatives(right))
    {
        if !options.contains(&part) {
            options.push(part);
        }
    }
    if options.is_empty() {
        left.to_string()
    } else {
        join_alternatives(&options)
    }
}

/// Narrows a multi-alternative condition for a base row (`tag == None`) or
/// a regional row.
///
/// Friendship against level keeps the level clause. Time-qualified against
/// unqualified keeps the time qualifier (night first) on regional rows and
/// drops it on base rows. Anything else is left as is.
pub fn select_for_tag(condition: &str, tag: Option<RegionalTag>) -> String {
    let parts = split_alternatives(condition);
    if parts.len() < 2 {
        return condition.to_string();
    }
    if let Some(level) = level_over_friendship(&parts) {
        return join_alternatives(&[level]);
    }

    let (timed, untimed): (Vec<&String>, Vec<&String>) =
        parts.iter().partition(|part| mentions_time_of_day(part));
    if timed.is_empty() || untimed.is_empty() {
        return condition.to_string();
    }
    let pick = match tag {
        Some(_) => timed
            .iter()
            .find(|part| has_word(part, "night"))
            .unwrap_or(&timed[0]),
        None => &untimed[0],
    };
    join_alternatives(&[(*pick).clone()])
}

fn level_over_friendship(clauses: &[String]) -> Option<String> {
    let has_friendship = clauses.iter().any(|clause| {
        let lower = clause.to_ascii_lowercase();
        lower.contains("friendship") || lower.contains("affection")
    });
    if !has_friendship {
        return None;
    }
    clauses.iter().find(|clause| is_level_clause(clause)).cloned()
}

fn is_level_clause(clause: &str) -> bool {
    clause
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("level"))
}

fn mentions_time_of_day(clause: &str) -> bool {
    has_word(clause, "night") || has_word(clause, "day")
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token.eq_ignore_ascii_case(word))
}

/// `thunder-stone` -> `Thunder Stone`.
pub fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn level_up(build: impl FnOnce(&mut LevelUp)) -> EvolutionDetail {
        let mut detail = LevelUp::default();
        build(&mut detail);
        EvolutionDetail::LevelUp(detail)
    }

    #[test]
    fn plain_level() {
        assert_eq!(describe(&[EvolutionDetail::level(16)]), "(Level 16)");
    }

    #[test]
    fn no_details_is_empty() {
        assert_eq!(describe(&[]), "");
        assert_eq!(
            describe(&[EvolutionDetail::Other {
                name: "future-trigger".to_string()
            }]),
            ""
        );
    }

    #[test]
    fn item_names_are_title_cased() {
        assert_eq!(
            describe(&[EvolutionDetail::use_item("thunder-stone")]),
            "(Use Thunder Stone)"
        );
        assert_eq!(describe(&[EvolutionDetail::UseItem { item: None }]), "");
    }

    #[test]
    fn level_with_time_of_day() {
        let detail = level_up(|d| {
            d.min_level = Some(25);
            d.time_of_day = Some("night".to_string());
        });
        assert_eq!(describe(&[detail]), "(Level 25 at night)");
    }

    #[test]
    fn affection_with_move_type() {
        let detail = level_up(|d| {
            d.min_affection = Some(2);
            d.known_move_type = Some("fairy".to_string());
        });
        assert_eq!(describe(&[detail]), "(High Affection + Fairy move)");
    }

    #[test]
    fn qualifier_suffixes_follow_fixed_order() {
        let detail = level_up(|d| {
            d.min_level = Some(20);
            d.party_type = Some("dark".to_string());
            d.party_species = Some("remoraid".to_string());
            d.relative_physical_stats = Some(RelativeStats::AttackHigher);
            d.gender = Some(Gender::Female);
        });
        assert_eq!(
            describe(&[detail]),
            "(Level 20, Female, Atk > Def, with Remoraid, with Dark type)"
        );
    }

    #[test]
    fn level_up_fallbacks() {
        let cases = [
            (level_up(|d| d.min_beauty = Some(171)), "(Beauty 171+)"),
            (
                level_up(|d| d.time_of_day = Some("day".to_string())),
                "(Level up at day)",
            ),
            (
                level_up(|d| d.location = Some("mount-coronet".to_string())),
                "(Near Mount Coronet)",
            ),
            (
                level_up(|d| d.known_move = Some("ancient-power".to_string())),
                "(Level up with Ancient Power)",
            ),
            (level_up(|d| d.needs_overworld_rain = true), "(Level up during rain)"),
            (level_up(|d| d.turn_upside_down = true), "(Turn upside down)"),
            (level_up(|_| {}), "(Level up)"),
        ];
        for (detail, expected) in cases {
            assert_eq!(describe(&[detail]), expected);
        }
    }

    #[test]
    fn trade_variants() {
        assert_eq!(
            describe(&[EvolutionDetail::Trade {
                held_item: Some("metal-coat".to_string()),
                trade_species: None,
            }]),
            "(Trade holding Metal Coat)"
        );
        assert_eq!(
            describe(&[EvolutionDetail::Trade {
                held_item: None,
                trade_species: Some("shelmet".to_string()),
            }]),
            "(Trade for Shelmet)"
        );
        assert_eq!(
            describe(&[EvolutionDetail::Trade {
                held_item: None,
                trade_species: None,
            }]),
            "(Trade)"
        );
    }

    #[test]
    fn special_triggers() {
        assert_eq!(describe(&[EvolutionDetail::Shed]), "(Level 20, empty slot)");
        assert_eq!(describe(&[EvolutionDetail::TakeDamage]), "(Take 49+ damage)");
        assert_eq!(describe(&[EvolutionDetail::RecoilDamage]), "(294+ recoil damage)");
        assert_eq!(describe(&[EvolutionDetail::StrongStyleMove]), "(Strong Style 20x)");
    }

    #[test]
    fn distinct_alternatives_are_joined_with_or() {
        assert_eq!(
            describe(&[
                EvolutionDetail::use_item("fire-stone"),
                EvolutionDetail::use_item("ice-stone"),
            ]),
            "(Use Fire Stone or Use Ice Stone)"
        );
    }

    #[test]
    fn identical_alternatives_collapse() {
        assert_eq!(
            describe(&[EvolutionDetail::level(30), EvolutionDetail::level(30)]),
            "(Level 30)"
        );
    }

    #[test]
    fn level_wins_over_friendship() {
        let details = [
            level_up(|d| d.min_happiness = Some(160)),
            EvolutionDetail::level(16),
        ];
        assert_eq!(describe(&details), "(Level 16)");
    }

    #[test]
    fn friendship_alone_is_kept() {
        let details = [level_up(|d| d.min_happiness = Some(220))];
        assert_eq!(describe(&details), "(High Friendship)");
    }

    #[test]
    fn time_qualifier_depends_on_row_kind() {
        let condition = "(Level 20 or Level 20 at night)";
        assert_eq!(select_for_tag(condition, None), "(Level 20)");
        assert_eq!(
            select_for_tag(condition, Some(RegionalTag::Alola)),
            "(Level 20 at night)"
        );
    }

    #[test]
    fn unrelated_alternatives_are_untouched() {
        let condition = "(Use Fire Stone or Use Ice Stone)";
        assert_eq!(select_for_tag(condition, None), condition);
        assert_eq!(select_for_tag("(Level 16)", Some(RegionalTag::Galar)), "(Level 16)");
    }

    #[test]
    fn merge_unions_alternatives() {
        assert_eq!(
            merge_conditions("(Use Fire Stone)", "(Use Ice Stone)"),
            "(Use Fire Stone or Use Ice Stone)"
        );
        assert_eq!(merge_conditions("", "(Level 5)"), "(Level 5)");
        assert_eq!(merge_conditions("(Level 5)", ""), "(Level 5)");
        assert_eq!(merge_conditions("(Level 5)", "(Level 5)"), "(Level 5)");
        assert_eq!(
            merge_conditions("(Trade or Level 5)", "(Level 5 or Trade holding Razor Claw)"),
            "(Trade or Level 5 or Trade holding Razor Claw)"
        );
    }

    #[test]
    fn merge_is_commutative_as_a_set() {
        let a = "(Use Fire Stone or Level 10)";
        let b = "(Level 10 or Trade)";
        let ab: BTreeSet<String> = split_alternatives(&merge_conditions(a, b)).into_iter().collect();
        let ba: BTreeSet<String> = split_alternatives(&merge_conditions(b, a)).into_iter().collect();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 3);
    }
}

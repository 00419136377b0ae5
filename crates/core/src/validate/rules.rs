#![forbid(unsafe_code)]

use super::Violations;
use super::candidate::{Candidate, CandidateMember};
use crate::model::{ADULT_AGE_YEARS, CI_DIGITS, RUC_DIGITS, is_digits};
use std::collections::BTreeSet;
use time::{Date, Month};

pub(super) struct RuleContext {
    pub(super) today: Date,
    /// Fields the read phase could not parse; their typed value is a placeholder.
    pub(super) unreadable: Violations,
}

/// One row of a rule table. `when` gates the rule on the candidate; a rule whose
/// gate is closed is not required and reports nothing. A rule is skipped when any
/// field in `reads` failed to parse.
pub(super) struct Rule {
    pub(super) field: &'static str,
    pub(super) reads: &'static [&'static str],
    pub(super) when: fn(&Candidate) -> bool,
    pub(super) check: fn(&Candidate, &RuleContext) -> bool,
    pub(super) message: &'static str,
}

pub(super) struct MemberRule {
    pub(super) field: &'static str,
    pub(super) check: fn(&CandidateMember) -> bool,
    pub(super) message: &'static str,
}

fn always(_: &Candidate) -> bool {
    true
}

fn digits_or_absent(value: &Option<String>, len: usize) -> bool {
    value.as_deref().is_none_or(|v| is_digits(v, len))
}

fn sums_to_total(a: Option<u32>, b: Option<u32>, total: Option<u32>) -> bool {
    let Some(total) = total else {
        return true;
    };
    u64::from(a.unwrap_or(0)) + u64::from(b.unwrap_or(0)) == u64::from(total)
}

pub(super) fn is_adult(date_of_birth: Date, today: Date) -> bool {
    let year = date_of_birth.year() + ADULT_AGE_YEARS;
    // A 29 February birthday comes of age on 1 March in common years.
    let coming_of_age = date_of_birth
        .replace_year(year)
        .or_else(|_| Date::from_calendar_date(year, Month::March, 1));
    match coming_of_age {
        Ok(day) => today >= day,
        Err(_) => false,
    }
}

const MEN_WOMEN_SUM: &str = "The sum of men and women must be equal to the total number of workers";
const OVER_UNDER_SUM: &str =
    "The sum of over 18 and under 18 must be equal to the total number of workers";

pub(super) const FIELD_RULES: &[Rule] = &[
    Rule {
        field: "name",
        reads: &[],
        when: always,
        check: |c, _| c.name.is_some(),
        message: "The name is obligatory",
    },
    Rule {
        field: "lastName",
        reads: &[],
        when: always,
        check: |c, _| c.last_name.is_some(),
        message: "The last name is obligatory",
    },
    Rule {
        field: "ci",
        reads: &[],
        when: always,
        check: |c, _| c.ci.is_some(),
        message: "The identity card is obligatory",
    },
    Rule {
        field: "ci",
        reads: &[],
        when: always,
        check: |c, _| digits_or_absent(&c.ci, CI_DIGITS),
        message: "The identity card must have 10 digits",
    },
    Rule {
        field: "dateOfBirth",
        reads: &[],
        when: always,
        check: |c, _| c.date_of_birth.is_some(),
        message: "The date of birth is obligatory",
    },
    Rule {
        field: "dateOfBirth",
        reads: &[],
        when: always,
        check: |c, ctx| c.date_of_birth.is_none_or(|dob| is_adult(dob, ctx.today)),
        message: "You must be older than 18 years",
    },
    Rule {
        field: "hasRuc",
        reads: &[],
        when: always,
        check: |c, _| c.has_ruc.is_some(),
        message: "You must indicate if you have RUC",
    },
    Rule {
        field: "gender",
        reads: &[],
        when: always,
        check: |c, _| c.gender.is_some(),
        message: "The gender is obligatory",
    },
    Rule {
        field: "hasFarm",
        reads: &[],
        when: always,
        check: |c, _| c.has_farm.is_some(),
        message: "You must indicate if you have a farm",
    },
    Rule {
        field: "hasWorkers",
        reads: &[],
        when: always,
        check: |c, _| c.has_workers.is_some(),
        message: "You must indicate if you have workers",
    },
    Rule {
        field: "hasPregnantWorkers",
        reads: &[],
        when: always,
        check: |c, _| c.has_pregnant_workers.is_some(),
        message: "You must indicate if you have pregnant workers",
    },
    Rule {
        field: "family",
        reads: &[],
        when: always,
        check: |c, _| c.family.is_some(),
        message: "The family information is obligatory",
    },
    Rule {
        field: "family",
        reads: &[],
        when: always,
        check: |c, _| c.family.as_ref().is_none_or(|members| !members.is_empty()),
        message: "You must provide at least one family member",
    },
];

/// Evaluated after normalization, so every `when` reads normalized values.
pub(super) const CONDITIONAL_RULES: &[Rule] = &[
    Rule {
        field: "rucNumber",
        reads: &[],
        when: Candidate::has_ruc,
        check: |c, _| c.ruc_number.is_some(),
        message: "The RUC number is obligatory",
    },
    Rule {
        field: "rucNumber",
        reads: &[],
        when: Candidate::has_ruc,
        check: |c, _| digits_or_absent(&c.ruc_number, RUC_DIGITS),
        message: "The RUC must have 13 digits",
    },
    Rule {
        field: "farmHa",
        reads: &[],
        when: Candidate::has_farm,
        check: |c, _| c.farm_ha.is_some(),
        message: "The hectares of the farm are obligatory",
    },
    Rule {
        field: "farmName",
        reads: &[],
        when: Candidate::has_farm,
        check: |c, _| c.farm_name.is_some(),
        message: "The name of the farm is obligatory",
    },
    Rule {
        field: "crops",
        reads: &[],
        when: Candidate::has_farm,
        check: |c, _| !c.crops.is_empty(),
        message: "You must enter at least one crop",
    },
    Rule {
        field: "totalWorkers",
        reads: &[],
        when: Candidate::has_workers,
        check: |c, _| c.total_workers.is_some(),
        message: "The total number of workers is obligatory",
    },
    Rule {
        field: "menWorkers",
        reads: &["totalWorkers", "menWorkers", "womanWorkers"],
        when: Candidate::has_workers,
        check: |c, _| sums_to_total(c.men_workers, c.woman_workers, c.total_workers),
        message: MEN_WOMEN_SUM,
    },
    Rule {
        field: "womanWorkers",
        reads: &["totalWorkers", "menWorkers", "womanWorkers"],
        when: Candidate::has_workers,
        check: |c, _| sums_to_total(c.men_workers, c.woman_workers, c.total_workers),
        message: MEN_WOMEN_SUM,
    },
    Rule {
        field: "over18Workers",
        reads: &["totalWorkers", "over18Workers", "under18Workers"],
        when: Candidate::has_workers,
        check: |c, _| sums_to_total(c.over18_workers, c.under18_workers, c.total_workers),
        message: OVER_UNDER_SUM,
    },
    Rule {
        field: "under18Workers",
        reads: &["totalWorkers", "over18Workers", "under18Workers"],
        when: Candidate::has_workers,
        check: |c, _| sums_to_total(c.over18_workers, c.under18_workers, c.total_workers),
        message: OVER_UNDER_SUM,
    },
    Rule {
        field: "minorWorkersOccupation",
        reads: &["under18Workers"],
        when: Candidate::has_minor_workers,
        check: |c, _| c.minor_workers_occupation.is_some(),
        message: "The occupation of the minor workers is obligatory",
    },
    Rule {
        field: "pregnantWorkers",
        reads: &["pregnantWorkers", "womanWorkers"],
        when: Candidate::has_pregnant_workers,
        check: |c, _| c.pregnant_workers.unwrap_or(0) <= c.woman_workers.unwrap_or(0),
        message: "The number of pregnant workers cannot be greater than the number of women workers",
    },
    Rule {
        field: "pregnantWorkersOccupation",
        reads: &["pregnantWorkers"],
        when: Candidate::has_pregnant_count,
        check: |c, _| c.pregnant_workers_occupation.is_some(),
        message: "The occupation of the pregnant workers is obligatory",
    },
];

pub(super) const MEMBER_RULES: &[MemberRule] = &[
    MemberRule {
        field: "name",
        check: |m| m.name.is_some(),
        message: "The family member's name is obligatory",
    },
    MemberRule {
        field: "lastName",
        check: |m| m.last_name.is_some(),
        message: "The family member's last name is obligatory",
    },
    MemberRule {
        field: "ci",
        check: |m| m.ci.is_some(),
        message: "The family member's identity card is obligatory",
    },
    MemberRule {
        field: "ci",
        check: |m| digits_or_absent(&m.ci, CI_DIGITS),
        message: "The identity card must have 10 digits",
    },
];

/// Fields that already carry a violation are skipped so each field reports its
/// first failure only.
pub(super) fn apply(
    rules: &[Rule],
    candidate: &Candidate,
    ctx: &RuleContext,
    violations: &mut Violations,
) {
    for rule in rules {
        if violations.contains(rule.field)
            || rule.reads.iter().any(|read| ctx.unreadable.contains(read))
            || !(rule.when)(candidate)
        {
            continue;
        }
        if !(rule.check)(candidate, ctx) {
            violations.push(rule.field, rule.message);
        }
    }
}

pub(super) fn apply_family(candidate: &Candidate, violations: &mut Violations) {
    let Some(members) = candidate.family.as_ref() else {
        return;
    };
    let mut seen = BTreeSet::new();
    for (index, member) in members.iter().enumerate() {
        if violations.contains(&format!("family[{index}]")) {
            continue;
        }
        for rule in MEMBER_RULES {
            let path = format!("family[{index}].{}", rule.field);
            if violations.contains(&path) {
                continue;
            }
            if !(rule.check)(member) {
                violations.push(path, rule.message);
            }
        }
        if let Some(ci) = member.ci.as_deref()
            && !seen.insert(ci)
        {
            let path = format!("family[{index}].ci");
            if !violations.contains(&path) {
                violations.push(path, "The identity card is repeated in the family list");
            }
        }
    }
}

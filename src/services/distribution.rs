// src/services/distribution.rs
//
// Distribuição de trabalhos entre revisores: afinidade, conflito de interesse
// e alocação gulosa respeitando o limite de cada revisor.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::review::{PendingSubmission, ReviewAssignment, Reviewer, Submission, SubmissionStatus},
};

/// Minúsculas, sem acentos, espaços colapsados.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().flat_map(char::to_lowercase).map(strip_accent).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

// Áreas inteiras e cada palavra delas
fn area_tokens(areas: &[String]) -> HashSet<String> {
    let mut tokens = HashSet::new();
    for area in areas {
        let normalized = normalize(area);
        if normalized.is_empty() {
            continue;
        }
        for word in normalized.split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '/') {
            if !word.is_empty() {
                tokens.insert(word.to_string());
            }
        }
        tokens.insert(normalized);
    }
    tokens
}

/// Afinidade em [0, 1]: 0.5 pela área temática + 0.5 × fração das palavras-chave cobertas.
pub fn score(reviewer: &Reviewer, submission: &Submission) -> f64 {
    let areas: HashSet<String> = reviewer.areas.iter().map(|a| normalize(a)).collect();
    let tokens = area_tokens(&reviewer.areas);

    let mut total = 0.0;
    let area = normalize(&submission.thematic_area);
    if !area.is_empty() && areas.contains(&area) {
        total += 0.5;
    }

    let keywords: Vec<String> = submission
        .keywords
        .iter()
        .map(|k| normalize(k))
        .filter(|k| !k.is_empty())
        .collect();
    if !keywords.is_empty() {
        let matched = keywords.iter().filter(|k| tokens.contains(*k)).count();
        total += 0.5 * matched as f64 / keywords.len() as f64;
    }
    total
}

/// O revisor é um dos autores (nome normalizado ou e-mail iguais).
pub fn has_conflict(reviewer: &Reviewer, submission: &Submission) -> bool {
    let name = normalize(&reviewer.full_name);
    let email = reviewer.email.trim().to_lowercase();

    submission.authors.iter().any(|author| {
        let same_name = !name.is_empty() && normalize(&author.name) == name;
        let same_email = author
            .email
            .as_deref()
            .map(|e| !email.is_empty() && e.trim().to_lowercase() == email)
            .unwrap_or(false);
        same_name || same_email
    })
}

/// Regras da atribuição manual. Devolve a afinidade do par.
pub fn check_manual_assignment(
    reviewer: &Reviewer,
    submission: &Submission,
    current_load: i64,
) -> Result<f64, AppError> {
    if !reviewer.is_active {
        return Err(AppError::ResourceNotFound("revisor ativo".into()));
    }
    if has_conflict(reviewer, submission) {
        return Err(AppError::ConflictOfInterest);
    }
    if current_load >= i64::from(reviewer.max_assignments) {
        return Err(AppError::ReviewerOverloaded);
    }
    Ok(score(reviewer, submission))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAssignment {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub score: f64,
}

#[derive(Debug, Default)]
pub struct DistributionPlan {
    pub assignments: Vec<PlannedAssignment>,
    pub pending: Vec<PendingSubmission>,
}

/// Plano guloso. `submissions` deve vir em ordem de criação; atribuições
/// existentes contam para a cobertura e para a carga dos revisores.
pub fn plan_distribution(
    submissions: &[Submission],
    reviewers: &[Reviewer],
    existing: &[ReviewAssignment],
    per_submission: usize,
) -> DistributionPlan {
    let mut load: HashMap<Uuid, i64> = HashMap::new();
    let mut pairs: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut coverage: HashMap<Uuid, usize> = HashMap::new();

    for assignment in existing {
        *load.entry(assignment.reviewer_id).or_default() += 1;
        pairs.insert((assignment.submission_id, assignment.reviewer_id));
        *coverage.entry(assignment.submission_id).or_default() += 1;
    }

    let mut plan = DistributionPlan::default();

    for submission in submissions {
        if submission.status == SubmissionStatus::Reviewed {
            continue;
        }
        let covered = coverage.get(&submission.id).copied().unwrap_or(0);
        let needed = per_submission.saturating_sub(covered);
        if needed == 0 {
            continue;
        }

        let mut candidates: Vec<(&Reviewer, f64, i64)> = reviewers
            .iter()
            .filter(|r| r.is_active)
            .filter(|r| !pairs.contains(&(submission.id, r.id)))
            .filter(|r| load.get(&r.id).copied().unwrap_or(0) < i64::from(r.max_assignments))
            .filter(|r| !has_conflict(r, submission))
            .map(|r| (r, score(r, submission), load.get(&r.id).copied().unwrap_or(0)))
            .collect();

        // maior afinidade, menor carga, nome
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.2.cmp(&b.2))
                .then_with(|| a.0.full_name.cmp(&b.0.full_name))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        let chosen: Vec<(Uuid, f64)> = candidates
            .into_iter()
            .take(needed)
            .map(|(r, s, _)| (r.id, s))
            .collect();

        for (reviewer_id, score) in &chosen {
            *load.entry(*reviewer_id).or_default() += 1;
            pairs.insert((submission.id, *reviewer_id));
            plan.assignments.push(PlannedAssignment {
                submission_id: submission.id,
                reviewer_id: *reviewer_id,
                score: *score,
            });
        }

        if chosen.len() < needed {
            plan.pending.push(PendingSubmission {
                submission_id: submission.id,
                missing_reviewers: needed - chosen.len(),
            });
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::{AssignmentKind, Author};
    use chrono::Utc;
    use sqlx::types::Json;

    fn reviewer(name: &str, email: &str, areas: &[&str], max: i32) -> Reviewer {
        Reviewer {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            event_id: Uuid::nil(),
            user_id: None,
            full_name: name.into(),
            email: email.into(),
            areas: areas.iter().map(|a| a.to_string()).collect(),
            max_assignments: max,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn submission(area: &str, keywords: &[&str], authors: &[(&str, Option<&str>)]) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            event_id: Uuid::nil(),
            title: "Trabalho".into(),
            abstract_text: None,
            thematic_area: area.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            authors: Json(
                authors
                    .iter()
                    .map(|(name, email)| Author {
                        name: name.to_string(),
                        email: email.map(str::to_string),
                    })
                    .collect(),
            ),
            status: SubmissionStatus::Submitted,
            created_at: Utc::now(),
        }
    }

    fn assignment(submission: &Submission, reviewer: &Reviewer) -> ReviewAssignment {
        ReviewAssignment {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            submission_id: submission.id,
            reviewer_id: reviewer.id,
            score: 0.0,
            kind: AssignmentKind::Automatic,
            due_date: None,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn normalization_strips_accents_and_case() {
        assert_eq!(normalize("  Educação   Física "), "educacao fisica");
        assert_eq!(normalize("ÁRVORE"), "arvore");
    }

    #[test]
    fn score_combines_area_and_keywords() {
        let r = reviewer("Ana", "ana@x.br", &["Ensino de Ciências", "astronomia"], 5);
        let full = submission("ensino de ciencias", &["Astronomia", "ciências"], &[]);
        assert_eq!(score(&r, &full), 1.0);

        let half_keywords = submission("Matemática", &["astronomia", "química"], &[]);
        assert_eq!(score(&r, &half_keywords), 0.25);

        let nothing = submission("História", &[], &[]);
        assert_eq!(score(&r, &nothing), 0.0);
    }

    #[test]
    fn conflict_by_name_or_email() {
        let r = reviewer("José Álvares", "Jose@Uni.br", &[], 5);
        assert!(has_conflict(&r, &submission("x", &[], &[("jose alvares", None)])));
        assert!(has_conflict(&r, &submission("x", &[], &[("Outro", Some("jose@uni.br "))])));
        assert!(!has_conflict(&r, &submission("x", &[], &[("Maria", Some("maria@uni.br"))])));
    }

    #[test]
    fn greedy_prefers_score_then_load_then_name() {
        let expert = reviewer("Zeca", "z@x.br", &["biologia"], 5);
        let generalist_b = reviewer("Bruno", "b@x.br", &[], 5);
        let generalist_a = reviewer("Alice", "a@x.br", &[], 5);
        let s = submission("Biologia", &[], &[]);

        let plan = plan_distribution(
            &[s.clone()],
            &[generalist_b.clone(), expert.clone(), generalist_a.clone()],
            &[],
            2,
        );
        let chosen: Vec<Uuid> = plan.assignments.iter().map(|a| a.reviewer_id).collect();
        assert_eq!(chosen, vec![expert.id, generalist_a.id]);
        assert!(plan.pending.is_empty());
    }

    #[test]
    fn never_assigns_conflicted_inactive_or_overloaded_reviewers() {
        let author = reviewer("Carla Dias", "carla@x.br", &["fisica"], 5);
        let mut inactive = reviewer("Davi", "davi@x.br", &["fisica"], 5);
        inactive.is_active = false;
        let busy = reviewer("Eva", "eva@x.br", &["fisica"], 1);
        let other = submission("outra", &[], &[]);
        let s = submission("Física", &[], &[("Carla Dias", None)]);

        let plan = plan_distribution(
            &[s.clone()],
            &[author, inactive, busy.clone()],
            &[assignment(&other, &busy)],
            1,
        );
        assert!(plan.assignments.is_empty());
        assert_eq!(
            plan.pending,
            vec![PendingSubmission { submission_id: s.id, missing_reviewers: 1 }]
        );
    }

    #[test]
    fn load_limit_holds_across_the_whole_run() {
        let only = reviewer("Ana", "ana@x.br", &[], 2);
        let subs: Vec<Submission> = (0..3).map(|_| submission("x", &[], &[])).collect();

        let plan = plan_distribution(&subs, &[only.clone()], &[], 1);
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.pending.len(), 1);
        // ordem de criação: o terceiro trabalho fica pendente
        assert_eq!(plan.pending[0].submission_id, subs[2].id);
    }

    #[test]
    fn rerun_is_idempotent() {
        let r1 = reviewer("Ana", "ana@x.br", &[], 5);
        let r2 = reviewer("Bia", "bia@x.br", &[], 5);
        let s = submission("x", &[], &[]);

        let first = plan_distribution(&[s.clone()], &[r1.clone(), r2.clone()], &[], 2);
        assert_eq!(first.assignments.len(), 2);

        let existing = vec![assignment(&s, &r1), assignment(&s, &r2)];
        let second = plan_distribution(&[s], &[r1, r2], &existing, 2);
        assert!(second.assignments.is_empty());
        assert!(second.pending.is_empty());
    }

    #[test]
    fn partially_covered_submission_only_gets_the_missing_reviewers() {
        let r1 = reviewer("Ana", "ana@x.br", &[], 5);
        let r2 = reviewer("Bia", "bia@x.br", &[], 5);
        let r3 = reviewer("Caio", "caio@x.br", &[], 5);
        let s = submission("x", &[], &[]);

        let plan = plan_distribution(&[s.clone()], &[r1.clone(), r2, r3], &[assignment(&s, &r1)], 2);
        assert_eq!(plan.assignments.len(), 1);
        assert_ne!(plan.assignments[0].reviewer_id, r1.id);
    }

    #[test]
    fn manual_assignment_applies_the_same_rules() {
        let r = reviewer("Ana", "ana@x.br", &["quimica"], 1);
        let s = submission("Química", &[], &[]);
        assert_eq!(check_manual_assignment(&r, &s, 0).unwrap(), 0.5);
        assert!(matches!(check_manual_assignment(&r, &s, 1), Err(AppError::ReviewerOverloaded)));

        let own = submission("Química", &[], &[("Ana", None)]);
        assert!(matches!(check_manual_assignment(&r, &own, 0), Err(AppError::ConflictOfInterest)));
    }
}

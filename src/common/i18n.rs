// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "en";

// (código, pt, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("tenant_access_denied", "Você não tem acesso a este cliente.", "You do not have access to this tenant."),
    (
        "invalid_tenant_header",
        "O cabeçalho x-tenant-id é obrigatório e deve ser um UUID.",
        "The x-tenant-id header is required and must be a UUID.",
    ),
    ("forbidden", "Seu perfil não permite esta ação ({0}).", "Your profile cannot perform this action ({0})."),
    ("resource_not_found", "Não encontrado: {0}.", "Not found: {0}."),
    ("unique_violation", "Registro duplicado: {0}.", "Duplicate record: {0}."),
    (
        "not_enough_seats",
        "Vagas insuficientes: {available} disponíveis, {requested} solicitadas.",
        "Not enough seats: {available} available, {requested} requested.",
    ),
    (
        "invalid_transition",
        "Não é possível mudar o agendamento de {from} para {to}.",
        "A booking cannot move from {from} to {to}.",
    ),
    (
        "teacher_blocked",
        "Professor bloqueado para novos agendamentos até {until}.",
        "Teacher is blocked from booking until {until}.",
    ),
    ("slot_in_the_past", "Este horário já começou ou já passou.", "This slot has already started or passed."),
    ("invalid_period", "Período inválido: {0}.", "Invalid period: {0}."),
    ("invalid_capacity", "Capacidade inválida: {0}.", "Invalid capacity: {0}."),
    ("slot_has_bookings", "O horário possui agendamentos ativos.", "The slot has active bookings."),
    (
        "duplicate_booking",
        "Você já possui um agendamento ativo neste horário.",
        "You already have an active booking for this slot.",
    ),
    (
        "checkin_not_allowed",
        "Check-in não permitido para agendamento com status {0}.",
        "Check-in is not allowed for a booking with status {0}.",
    ),
    (
        "conflict_of_interest",
        "O revisor é autor do trabalho (conflito de interesse).",
        "The reviewer is an author of the submission (conflict of interest).",
    ),
    ("reviewer_overloaded", "O revisor atingiu o limite de trabalhos.", "The reviewer has reached the assignment limit."),
    ("assignment_already_completed", "Esta revisão já foi enviada.", "This review has already been submitted."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Catálogo de mensagens por idioma ("pt", "en").
#[derive(Debug)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut pt = HashMap::new();
        let mut en = HashMap::new();
        for (code, pt_msg, en_msg) in MESSAGES {
            pt.insert(*code, *pt_msg);
            en.insert(*code, *en_msg);
        }

        let mut messages = HashMap::new();
        messages.insert("pt", pt);
        messages.insert("en", en);
        Self { messages }
    }

    /// Catálogo único do processo. O AppState guarda esta mesma referência.
    pub fn global() -> &'static I18nStore {
        static STORE: OnceLock<I18nStore> = OnceLock::new();
        STORE.get_or_init(I18nStore::new)
    }

    pub fn translate(&self, lang: &str, code: &str, params: &[(&str, String)]) -> String {
        let template = self
            .messages
            .get(lang)
            .or_else(|| self.messages.get(DEFAULT_LANG))
            .and_then(|catalog| catalog.get(code))
            .copied()
            .unwrap_or(code);

        params.iter().fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{}}}", key), value)
        })
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_both_languages() {
        let store = I18nStore::new();
        for (code, _, _) in MESSAGES {
            assert_ne!(store.translate("pt", code, &[]), *code);
            assert_ne!(store.translate("en", code, &[]), *code);
        }
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        let store = I18nStore::new();
        assert_eq!(
            store.translate("de", "user_not_found", &[]),
            store.translate(DEFAULT_LANG, "user_not_found", &[])
        );
    }

    #[test]
    fn placeholders_are_replaced() {
        let store = I18nStore::new();
        let text = store.translate("pt", "resource_not_found", &[("0", "Evento".to_string())]);
        assert_eq!(text, "Não encontrado: Evento.");
    }

    #[test]
    fn global_store_is_a_single_instance() {
        assert!(std::ptr::eq(I18nStore::global(), I18nStore::global()));
    }

    #[test]
    fn unknown_code_is_returned_as_is() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "nope", &[]), "nope");
    }
}

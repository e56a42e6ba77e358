// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned replies used when no completion is available.

use std::sync::LazyLock;

use recall_core::Fact;
use regex::Regex;

static SPANISH_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[¿¡ñáéíóú]|\b(?:hola|buenos|buenas|gracias|adios|hasta|me llamo|tengo|quiero|qué|cómo|por favor)\b",
    )
    .unwrap()
});

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hola|buenos días|buenas tardes|buenas noches|hello|hi|hey|good morning|good evening)\b")
        .unwrap()
});

static FAREWELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hasta luego|hasta pronto|chao|bye|goodbye|see you)\b|adiós|adios").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Spanish,
    English,
}

fn detect_language(message: &str) -> Language {
    if SPANISH_HINTS.is_match(message) {
        Language::Spanish
    } else {
        Language::English
    }
}

/// Deterministic reply for `message`. Greets by name when a `name` fact is known.
pub fn fallback_response(message: &str, facts: &[Fact]) -> String {
    let language = detect_language(message);
    let name = facts
        .iter()
        .find(|f| f.key == "name")
        .map(|f| f.value.as_str());

    if FAREWELL.is_match(message) {
        return match language {
            Language::Spanish => {
                "¡Hasta luego! Ha sido un placer ayudarte. ¡Que tengas un buen día!".to_string()
            }
            Language::English => {
                "Goodbye! It was a pleasure helping you. Have a great day!".to_string()
            }
        };
    }

    if GREETING.is_match(message) {
        return match (language, name) {
            (Language::Spanish, Some(name)) => {
                format!("¡Hola {name}! Es un placer verte de nuevo. ¿En qué puedo ayudarte hoy?")
            }
            (Language::Spanish, None) => {
                "¡Hola! Soy tu asistente con memoria persistente. ¿En qué puedo ayudarte?"
                    .to_string()
            }
            (Language::English, Some(name)) => {
                format!("Hello {name}! Nice to see you again. How can I help you today?")
            }
            (Language::English, None) => {
                "Hello! I'm your assistant with persistent memory. How can I help you?".to_string()
            }
        };
    }

    match language {
        Language::Spanish => {
            format!("He recibido tu mensaje: '{message}'. Información guardada en memoria.")
        }
        Language::English => {
            format!("I received your message: '{message}'. It has been saved to memory.")
        }
    }
}

//! Localized system-prompt templates and user-facing service messages.
//!
//! Kyrgyz (`ky`) is the default; Russian (`ru`) is the only other
//! supported language. Any other tag normalizes to Kyrgyz.

use chrono::Utc;
use chrono_tz::Asia::Bishkek;

use crate::schema::norm_lang;

/// Local date/time rendered into the base system prompt.
fn local_datetime() -> String {
    Utc::now()
        .with_timezone(&Bishkek)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

/// The draft-pass system prompt: assistant identity, the directive
/// format, and the generated function documentation.
pub fn base_system_prompt(lang: &str, function_docs: &str) -> String {
    let now = local_datetime();
    if norm_lang(lang) == "ru" {
        format!(
            "\
Ты — умный ассистент AiBank, который умеет использовать функции MCP (model context protocol).
ЛОКАЛЬНАЯ ДАТА И ВРЕМЯ (Бишкек): {now}

ПРАВИЛА:
1. Функции MCP подключены к основной системе банка — их использование ОБЯЗАТЕЛЬНО.
2. Если для запроса пользователя есть функция MCP — сначала вызывай функцию.
3. Если подходящей функции нет — представься и предложи помощь.
4. Если имя пользователя доступно — обращайся по имени: [user_name] ...
5. Отвечай коротко и чётко.

ФОРМАТ ВЫЗОВА ФУНКЦИИ:
[FUNC_CALL:name=имя_функции, параметр1=значение1, параметр2=значение2]

ПРИМЕРЫ:
- \"Покажи мой баланс\" → [FUNC_CALL:name=get_balance]
- \"Мои последние платежи\" → [FUNC_CALL:name=get_transactions, limit=5]
- \"Переведи 1000 сомов Айгуль\" → [FUNC_CALL:name=transfer_money, amount=1000, to_name=Айгуль]

ДОСТУПНЫЕ ФУНКЦИИ:
{function_docs}

ЕСЛИ ОТВЕТОМ ЯВЛЯЕТСЯ ВЫЗОВ MCP-ФУНКЦИИ, ТО В ОТВЕТЕ ДОЛЖЕН БЫТЬ ТОЛЬКО ВЫЗОВ ФУНКЦИИ (ДАЖЕ ИМЯ ПОЛЬЗОВАТЕЛЯ НЕ УКАЗЫВАТЬ).
user_id добавляется автоматически."
        )
    } else {
        format!(
            "\
Сен MCP (model context protocol) функцияларын колдоно турган акылдуу AiBankтин ассистентисиң.
ЖЕРГИЛИКТҮҮ ДАТА/УБАКЫТ (Бишкек): {now}

ЭРЕЖЕЛЕР:
1. MCP функциялары банктын негизги системасына туташкан — аларды колдонуу МИЛДЕТТҮҮ.
2. Колдонуучунун суроосу үчүн MCP функциясы бар болсо — алгач функцияны чакыр.
3. Жеткиликтүү функция жок болсо, өзүңдү тааныштырып, колдонуучуга жардам сунушта.
4. Колдонуучунун аты жеткиликтүү болсо, аты менен кайрыл: [user_name]...
5. Кыска жана так жооп бер.

ФУНКЦИЯ ЧАКЫРУУ ФОРМАТЫ:
[FUNC_CALL:name=функция_аты, параметр1=маани1, параметр2=маани2]

МИСАЛДАР:
- \"Балансымды көрсөт\" → [FUNC_CALL:name=get_balance]
- \"Акыркы төлөмдөрүм\" → [FUNC_CALL:name=get_transactions, limit=5]
- \"1000 сомду Айгүлгө котор\" → [FUNC_CALL:name=transfer_money, amount=1000, to_name=Айгүл]

ЖЕТКИЛИКТҮҮ ФУНКЦИЯЛАР:
{function_docs}

ЭГЕР ЖООП КАТАРЫ MCP ФУНКЦИЯ ЧАКЫРЫЛСА, АНДА ЖООПТО ФУНКЦИЯНЫ ЧАКЫРУУ ГАНА БОЛСУН (ЖАДА КАЛСА КОЛДОНУУЧУНУН АТЫ ДА БОЛБОСУН).
user_id автоматтык кошулат."
        )
    }
}

fn display_name(lang: &str, user_name: Option<&str>) -> String {
    match user_name {
        Some(name) => name.to_string(),
        None if norm_lang(lang) == "ru" => "Пользователь".to_string(),
        None => "Колдонуучу".to_string(),
    }
}

/// Final-pass template when any dispatched call was the FAQ lookup:
/// the model must answer verbatim from the retrieved Q/A pairs.
pub fn faq_system_prompt(lang: &str, user_name: Option<&str>, tool_response: &str) -> String {
    let name = display_name(lang, user_name);
    if norm_lang(lang) == "ru" {
        format!(
            "\
Вы умный ассистент от Ai Bank.
Имя пользователя: {name}
Обращайтесь к пользователю по имени.
Если есть другая информация на другом языке, переведите её на ru язык и не сообщайте пользователю об этом.
Сформулируйте красивый и полезный ответ на ru языке. Если есть ошибка, объясните вежливо.
Ответьте на вопрос пользователя точно из этих FAQ вопросов-ответов.
FAQ вопросы-ответы:\n{tool_response}"
        )
    } else {
        format!(
            "\
Сиз Ai Bankтын акылдуу жардамчысысыз.
Колдонуучунун аты: {name}
Колдонуучуну анын аты менен кайрылыңыз.
Эгер башка тилде маалымат бар болсо, ky тилине которуп, колдонуучуга бул тууралуу билдирбе.
ky тилинде кооз жана жардамдуу жооп түзүңүз. Эгер ката болсо, аны сылыктык менен түшүндүрүңүз.
Колдонуучунун суроосуна ушул FAQ суроо-жоопторунан так жооп бериңиз.
FAQ суроо-жооптору:\n{tool_response}"
        )
    }
}

/// Final-pass template for every other tool result.
pub fn tool_response_system_prompt(lang: &str, user_name: Option<&str>, tool_response: &str) -> String {
    let name = display_name(lang, user_name);
    if norm_lang(lang) == "ru" {
        format!(
            "\
Вы умный ассистент от Ai Bank.
Имя пользователя: {name}
Ответ MCP(Model Context Protocol): {tool_response}
Обращайтесь к пользователю по имени.
Если есть другая информация на другом языке, переведите её на ru язык и не сообщайте пользователю об этом.
Сформулируйте понятный ответ на ru языке. Если есть ошибка, объясните вежливо."
        )
    } else {
        format!(
            "\
Сиз Ai Bankтын акылдуу жардамчысысыз.
Колдонуучунун аты: {name}
MCP(Model Context Protocol) жообу: {tool_response}
Колдонуучуну анын аты менен кайрылыңыз.
Эгер башка тилде маалымат бар болсо, ky тилине которуп, колдонуучуга бул тууралуу билдирбе.
ky тилинде тушунуктуу жооп түзүңүз. Эгер ката болсо, аны сылыктык менен түшүндүрүңүз."
        )
    }
}

/// Refusal shown when an anonymous caller requests a restricted tool.
pub fn auth_required_message(lang: &str) -> &'static str {
    if norm_lang(lang) == "ru" {
        "Извините, для ответа на этот запрос необходимо войти в систему (авторизация)."
    } else {
        "Кечиресиз, бул суроонузга жооп алуу учун системага кириниз (авторизация)."
    }
}

/// Shown when the upstream model endpoint itself fails.
pub fn upstream_failure_message(lang: &str) -> &'static str {
    if norm_lang(lang) == "ru" {
        "Извините, сервис временно недоступен. Пожалуйста, попробуйте позже."
    } else {
        "Кечиресиз, кызмат убактылуу жеткиликсиз. Кийинчерээк кайра аракет кылыңыз."
    }
}

/// Prefix for a per-call error placeholder fed back to the model.
pub fn call_error_placeholder(lang: &str, detail: &str) -> String {
    if norm_lang(lang) == "ru" {
        format!("Ошибка: {detail}")
    } else {
        format!("Ката: {detail}")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_prompt_embeds_docs_and_format() {
        let prompt = base_system_prompt("ru", "\tget_balance — Баланс. Параметры: lang");
        assert!(prompt.contains("[FUNC_CALL:name="));
        assert!(prompt.contains("get_balance — Баланс"));
        assert!(prompt.contains("Бишкек"));
    }

    #[test]
    fn unknown_language_falls_back_to_ky() {
        let prompt = base_system_prompt("en", "docs");
        assert!(prompt.contains("AiBankтин ассистентисиң"));
    }

    #[test]
    fn faq_prompt_carries_tool_response_and_name() {
        let prompt = faq_system_prompt("ru", Some("Айгуль"), "Q: x\nA: y");
        assert!(prompt.contains("Айгуль"));
        assert!(prompt.contains("Q: x\nA: y"));
        assert!(prompt.contains("FAQ"));
    }

    #[test]
    fn anonymous_user_gets_generic_name() {
        let ky = tool_response_system_prompt("ky", None, "r");
        assert!(ky.contains("Колдонуучу"));
        let ru = tool_response_system_prompt("ru", None, "r");
        assert!(ru.contains("Пользователь"));
    }

    #[test]
    fn refusal_is_localized() {
        assert!(auth_required_message("ru").contains("авторизация"));
        assert!(auth_required_message("ky").contains("авторизация"));
        assert_ne!(auth_required_message("ru"), auth_required_message("ky"));
        // Fallback matches ky.
        assert_eq!(auth_required_message("en"), auth_required_message("ky"));
    }

    #[test]
    fn error_placeholder_is_localized() {
        assert_eq!(call_error_placeholder("ru", "boom"), "Ошибка: boom");
        assert_eq!(call_error_placeholder("ky", "boom"), "Ката: boom");
    }
}

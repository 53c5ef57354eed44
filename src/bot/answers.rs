use serde::{Deserialize, Serialize};

use super::classifier::CommandKeywords;

/// Reply templates for every user-visible outcome.
///
/// Expected conditions (unknown command, unknown class login, empty
/// homework, no login saved) are answered with these configured texts,
/// never with raw error output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotAnswers {
    /// Help text; `{login}`, `{help}`, `{tomorrow_homework}` and
    /// `{all_homework}` placeholders expand to the keyword lists.
    pub help: String,
    pub unknown_command: String,
    pub login_saved: String,
    /// `{login}` placeholder echoes the rejected class login.
    pub wrong_login: String,
    pub empty_login: String,
    pub no_login_set: String,
    pub empty_tomorrow_homework: String,
    pub empty_all_homework: String,
}

impl Default for BotAnswers {
    fn default() -> Self {
        Self {
            help: "Я бот щоденника AveDiary 📚\n\n\
                   Запам'ятати логін класу:\n{login}\n\n\
                   Довідка:\n{help}\n\n\
                   Завдання на завтра:\n{tomorrow_homework}\n\n\
                   Всі завдання:\n{all_homework}"
                .to_string(),
            unknown_command: "Я не зрозумів команду 😔 Напишіть «допомога», щоб побачити список команд.".to_string(),
            login_saved: "Логін класу збережено! Тепер можна питати про завдання.".to_string(),
            wrong_login: "Не знайшов клас із логіном «{login}». Перевірте логін і спробуйте ще раз.".to_string(),
            empty_login: "Ви не вказали логін класу. Напишіть, наприклад: «увійти 10a».".to_string(),
            no_login_set: "Спершу збережіть логін класу командою «увійти <логін>».".to_string(),
            empty_tomorrow_homework: "На завтра завдань немає 🎉".to_string(),
            empty_all_homework: "Завдань немає 🎉".to_string(),
        }
    }
}

impl BotAnswers {
    /// Renders the help reply, substituting each keyword-category
    /// placeholder with its newline-joined keyword list.
    pub fn render_help(&self, keywords: &CommandKeywords) -> String {
        self.help
            .replace("{login}", &keywords.login.join("\n"))
            .replace("{help}", &keywords.help.join("\n"))
            .replace("{tomorrow_homework}", &keywords.tomorrow_homework.join("\n"))
            .replace("{all_homework}", &keywords.all_homework.join("\n"))
    }

    /// Renders the unknown-class-login reply with the candidate echoed.
    pub fn render_wrong_login(&self, candidate: &str) -> String {
        self.wrong_login.replace("{login}", candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_help_expands_keyword_lists() {
        let answers = BotAnswers::default();
        let keywords = CommandKeywords::default();

        let help = answers.render_help(&keywords);
        assert!(help.contains("увійти\nлогін\nlogin"));
        assert!(help.contains("допомога\nдовідка\nhelp"));
        assert!(!help.contains("{login}"));
        assert!(!help.contains("{all_homework}"));
    }

    #[test]
    fn test_render_wrong_login_echoes_candidate() {
        let answers = BotAnswers::default();
        let reply = answers.render_wrong_login("10A");
        assert!(reply.contains("10A"));
        assert!(!reply.contains("{login}"));
    }
}

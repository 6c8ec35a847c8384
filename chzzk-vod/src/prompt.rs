use crate::{
    downloader::{ConflictChooser, OnExists},
    error::{Error, Result},
};
use kdam::term::Colorizer;
use std::{
    fmt::Display,
    io::{self, Write},
    path::Path,
};

fn prompt_error(e: impl Display) -> Error {
    Error::invalid_input(format!("could not read user input ({})", e))
}

/// Interactive questions, modern (requestty) or raw stdin ones for old terminals.
#[derive(Clone, Copy, Debug, Default)]
pub struct Prompts {
    /// Answer every question with its default.
    pub skip: bool,
    pub raw: bool,
}

impl Prompts {
    fn read_line(&self, message: &str) -> Result<String> {
        print!("{}", message);
        io::stdout().flush().map_err(prompt_error)?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).map_err(prompt_error)?;
        Ok(input.trim().to_owned())
    }

    /// Index of the chosen item, `default` when prompts are skipped or the
    /// raw answer is empty.
    pub fn select<T: Display>(&self, message: &str, choices: &[T], default: usize) -> Result<usize> {
        if choices.is_empty() {
            return Err(Error::invalid_input(format!("{}: nothing to choose from", message)));
        }

        let default = default.min(choices.len() - 1);

        if self.skip || self.raw {
            println!("{}:", message);

            for (i, choice) in choices.iter().enumerate() {
                println!(
                    "{:2}) [{}] {}",
                    i + 1,
                    if i == default { 'x' } else { ' ' },
                    choice
                );
            }

            println!("------------------------------");

            if self.skip {
                return Ok(default);
            }

            let input = self.read_line(
                "Press enter to proceed with defaults.\n\
                Or select one option (1, 2, etc.): ",
            )?;
            println!("------------------------------");

            if input.is_empty() {
                return Ok(default);
            }

            return input
                .parse::<usize>()
                .ok()
                .and_then(|x| x.checked_sub(1))
                .filter(|x| *x < choices.len())
                .ok_or_else(|| Error::invalid_input(format!("{} is not a listed option", input)));
        }

        let question = requestty::Question::select("select")
            .message(message)
            .should_loop(false)
            .choices(choices.iter().map(|x| x.to_string()))
            .default(default)
            .build();
        let answer = requestty::prompt_one(question).map_err(prompt_error)?;

        answer
            .as_list_item()
            .map(|x| x.index)
            .ok_or_else(|| prompt_error("no option was selected"))
    }

    pub fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        if self.skip {
            return Ok(default);
        }

        if self.raw {
            let input = self.read_line(&format!(
                "{} [{}] ",
                message,
                if default { "Y/n" } else { "y/N" }
            ))?;

            return Ok(match input.to_ascii_lowercase().as_str() {
                "" => default,
                "y" | "yes" => true,
                _ => false,
            });
        }

        let question = requestty::Question::confirm("confirm")
            .message(message)
            .default(default)
            .build();
        let answer = requestty::prompt_one(question).map_err(prompt_error)?;
        Ok(answer.as_bool().unwrap_or(default))
    }

    /// Free text answer, an empty answer gives `default`.
    pub fn input(&self, message: &str, default: &str) -> Result<String> {
        if self.skip {
            return Ok(default.to_owned());
        }

        let answer = if self.raw {
            self.read_line(&format!("{} ({}): ", message, default.colorize("cyan")))?
        } else {
            let question = requestty::Question::input("input")
                .message(message)
                .default(default)
                .build();
            let answer = requestty::prompt_one(question).map_err(prompt_error)?;
            answer.as_string().unwrap_or_default().trim().to_owned()
        };

        Ok(if answer.is_empty() {
            default.to_owned()
        } else {
            answer
        })
    }
}

impl ConflictChooser for Prompts {
    fn choose(&self, path: &Path) -> Result<OnExists> {
        let choices = [OnExists::Resume, OnExists::Overwrite, OnExists::Skip];
        // skipping prompts keeps the file untouched
        let default = if self.skip { 2 } else { 0 };
        let index = self.select(
            &format!("{} already exists", path.to_string_lossy()),
            &choices,
            default,
        )?;
        Ok(choices[index])
    }
}

//! Chat command - interactive conversation with session context

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::{init_console_logging, load_config};
use crate::domain::SessionContext;

const HELP: &str = "\
Comandos:
  help     muestra esta ayuda
  cache    estadísticas del caché
  context  contexto de la conversación
  reset    olvida la conversación
  exit     termina la sesión
Cualquier otro texto se trata como una pregunta.";

#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Help,
    Cache,
    Context,
    Reset,
    Exit,
    Question(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Self::Empty,
            "help" | "ayuda" => Self::Help,
            "cache" | "caché" => Self::Cache,
            "context" | "contexto" => Self::Context,
            "reset" => Self::Reset,
            "exit" | "quit" | "salir" => Self::Exit,
            _ => Self::Question(line.to_string()),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    init_console_logging(&config);

    let runtime = crate::create_runtime(&config).await?;
    let mut context = SessionContext::new(config.session.max_history);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Asistente de agenda. Escribe 'help' para ver los comandos.");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Help => println!("{}", HELP),
            ChatInput::Cache => {
                let stats = runtime.assistant.cache_stats();
                println!(
                    "Entradas: {}/{}  Aciertos: {}  Fallos: {}  Tasa: {:.1}%  Desalojos: {}",
                    stats.size,
                    stats.max_size,
                    stats.hits,
                    stats.misses,
                    stats.hit_rate * 100.0,
                    stats.evictions
                );
            }
            ChatInput::Context => match (context.previous_query(), context.previous_answer()) {
                (Some(query), Some(answer)) => {
                    println!("Consulta anterior: {}\nRespuesta anterior: {}", query, answer);
                    println!("Consultas en el historial: {}", context.history_len());
                }
                _ => println!("Sin contexto todavía."),
            },
            ChatInput::Reset => {
                context.reset();
                println!("Contexto reiniciado.");
            }
            ChatInput::Exit => break,
            ChatInput::Question(query) => {
                match runtime.assistant.answer(&query, Some(&context)).await {
                    Ok(answer) => {
                        let marker = if answer.cached { " (caché)" } else { "" };
                        println!("{}{}", answer.answer, marker);
                        context.record(query, answer.answer);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Query failed");
                        println!("{}", e.user_message());
                    }
                }
            }
        }
    }

    runtime.save_cache().await;
    println!("Hasta luego.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatInput::parse("  "), ChatInput::Empty);
        assert_eq!(ChatInput::parse("HELP"), ChatInput::Help);
        assert_eq!(ChatInput::parse("salir"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("contexto"), ChatInput::Context);
    }

    #[test]
    fn test_anything_else_is_a_question() {
        assert_eq!(
            ChatInput::parse(" ¿Y su teléfono? "),
            ChatInput::Question("¿Y su teléfono?".to_string())
        );
    }
}

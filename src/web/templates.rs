//! # Templates Maud
//!
//! Uma página mínima de chat. O script inline cria a sessão via
//! `POST /api/session`, envia cada mensagem para `/api/chat` e destaca os
//! recursos de crise quando a resposta traz `priority: "urgent"`.
//!
//! ```text
//! ┌──────────── header ─────────────┐
//! │ Mindful Chat            ● status│
//! ├─────────────────────────────────┤
//! │  mensagens                      │
//! │  [crise: 988 · 741741 · 911]    │
//! ├─────────────────────────────────┤
//! │ [__________________] [Send]     │
//! └─────────────────────────────────┘
//! ```

use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f4f6f8; }
.shell { max-width: 720px; margin: 0 auto; display: flex; flex-direction: column; height: 100vh; }
header { display: flex; justify-content: space-between; padding: 1rem; background: #2f6f73; color: white; }
#messages { flex: 1; overflow-y: auto; padding: 1rem; }
.msg { margin: .5rem 0; padding: .6rem .8rem; border-radius: 8px; white-space: pre-wrap; }
.user { background: #dfeff0; align-self: flex-end; }
.bot { background: white; }
.urgent { border-left: 4px solid #c0392b; }
form { display: flex; gap: .5rem; padding: 1rem; }
input { flex: 1; padding: .6rem; }
"#;

const SCRIPT: &str = r#"
let sessionId = null;
const log = document.getElementById('messages');
function push(text, cls) {
  const div = document.createElement('div');
  div.className = 'msg ' + cls;
  div.textContent = text;
  log.appendChild(div);
  log.scrollTop = log.scrollHeight;
}
async function ensureSession() {
  if (sessionId) return sessionId;
  const res = await fetch('/api/session', { method: 'POST' });
  sessionId = (await res.json()).session_id;
  return sessionId;
}
document.getElementById('chat-form').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const input = document.getElementById('chat-input');
  const message = input.value.trim();
  if (!message) return;
  input.value = '';
  push(message, 'user');
  const res = await fetch('/api/chat', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ session_id: await ensureSession(), message }),
  });
  const data = await res.json();
  push(data.message, data.priority === 'urgent' ? 'bot urgent' : 'bot');
});
async function pollStatus() {
  const res = await fetch('/status');
  const data = await res.json();
  document.getElementById('status').textContent = data.ready ? '● models ready' : '○ rules only';
}
pollStatus();
setInterval(pollStatus, 5000);
"#;

pub fn chat_page() -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Mindful Chat" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="shell" {
                    header {
                        strong { "Mindful Chat" }
                        span id="status" { "○ rules only" }
                    }
                    div id="messages" {
                        div class="msg bot" {
                            "Hi, I'm here to listen. How are you feeling today?"
                        }
                    }
                    p class="msg bot urgent" {
                        "If you are in danger, call or text 988, text HOME to 741741, or call 911."
                    }
                    form id="chat-form" {
                        input id="chat-input" type="text" autocomplete="off"
                            placeholder="Type how you're feeling...";
                        button type="submit" { "Send" }
                    }
                }
                script { (PreEscaped(SCRIPT)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_wires_the_chat_api() {
        let page = chat_page().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("/api/chat"));
        assert!(page.contains("chat-form"));
        assert!(page.contains("988"));
    }
}

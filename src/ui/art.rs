//! 待机画面使用的字符画

pub const IDLE_FRAMES: &[&str] = &[
    r#"
   _____            __  _            __        ______
  / ___/___  ____  / /_(_)__  ____  / /_      / ____/
  \__ \/ _ \/ __ \/ __/ / _ \/ __ \/ __/_____/___ \
 ___/ /  __/ / / / /_/ /  __/ / / / /_/_____/___/ /
/____/\___/_/ /_/\__/_/\___/_/ /_/\__/     /_____/
"#,
    r#"
        .-""""""-.
      .'          '.
     /   O      O   \
    :                :
    |                |
    :    .------.    :
     \  '        '  /
      '.          .'
        '-......-'
"#,
    r#"
   [  I  S E E  Y O U  ]
        .----------.
       /  .------.  \
      |  /   ()   \  |
       \  '------'  /
        '----------'
"#,
    r#"
     PRESS ANY KEY TO BEGIN
   ..........................
   :  openness              :
   :  conscientiousness     :
   :  extraversion          :
   :  agreeableness         :
   :  neuroticism           :
   :........................:
"#,
];

pub const LOADING_TEXT: &str = "Initializing System...";

pub const EXIT_TEXT: &str = "Session closed. Goodbye.";

/// 按终端宽度居中每一行
pub fn center(text: &str, width: usize) -> String {
    text.lines()
        .map(|line| {
            let len = line.chars().count();
            if len >= width {
                line.to_string()
            } else {
                format!("{}{}", " ".repeat((width - len) / 2), line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

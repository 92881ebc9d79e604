/*!
 * LaTeX building blocks shared by the typesetting and interlinear adapters.
 */

use crate::document::ElementKind;

/// How one element kind is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMarkup {
    /// Environment wrapping the element and its children, if any
    pub environment: Option<&'static str>,
    /// Command applied to each language variant of the element's text
    pub text_command: &'static str,
}

/// Dispatch table from element kind to its markup
pub fn kind_markup(kind: &ElementKind) -> KindMarkup {
    match kind {
        ElementKind::Document => KindMarkup {
            environment: None,
            text_command: "ltext",
        },
        ElementKind::Section => KindMarkup {
            environment: Some("lsection"),
            text_command: "lheading",
        },
        ElementKind::Heading => KindMarkup {
            environment: None,
            text_command: "lheading",
        },
        ElementKind::Paragraph => KindMarkup {
            environment: None,
            text_command: "lpara",
        },
        ElementKind::Rubric => KindMarkup {
            environment: None,
            text_command: "lrubric",
        },
        ElementKind::Verse => KindMarkup {
            environment: None,
            text_command: "lverse",
        },
        ElementKind::Other(_) => KindMarkup {
            environment: None,
            text_command: "ltext",
        },
    }
}

/// Preamble shared by all generated sources; defines every command the
/// adapters emit so the output compiles with xelatex as-is.
pub const PREAMBLE: &str = r"\documentclass[11pt]{article}
\usepackage{fontspec}
\usepackage{xcolor}
\setmainfont{FreeSerif}
\newenvironment{lsection}[1]{\par\medskip}{\par}
\newenvironment{lrow}[1]{\par\noindent}{\par}
\newenvironment{linterlinear}[3]{\par\noindent}{\par\medskip}
\newcommand{\ltext}[2]{#2\par}
\newcommand{\lheading}[2]{{\large\bfseries #2}\par}
\newcommand{\lpara}[2]{#2\par}
\newcommand{\lrubric}[2]{{\color{red}#2}\par}
\newcommand{\lverse}[2]{\hspace{1em}#2\par}
\newcommand{\lgloss}[2]{\shortstack[l]{#1\\\textit{#2}}\ }
\newcommand{\lphrase}[2]{#1\par\textit{#2}\par}
";

/// Wrap a body in the shared preamble and document environment
pub fn wrap_document(body: &str) -> String {
    let mut out = String::with_capacity(PREAMBLE.len() + body.len() + 64);
    out.push_str(PREAMBLE);
    out.push_str("\\begin{document}\n");
    out.push_str(body);
    out.push_str("\\end{document}\n");
    out
}

/// Escape text for use inside a LaTeX argument
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' => out.push_str("\\$"),
            '&' => out.push_str("\\&"),
            '#' => out.push_str("\\#"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Two-space indentation for a nesting depth
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

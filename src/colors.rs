//! Canonical language colors for the aggregated series.

/// Color used for languages absent from the table.
pub(crate) const DEFAULT_COLOR: &str = "#cccccc";

/// Canonical language names mapped to their display colors.
///
/// The palette follows the colors GitHub itself renders for repository
/// languages; lookups are exact-match on the provider's language name.
const LANGUAGE_COLORS: &[(&str, &str)] = &[
    ("1C Enterprise", "#814CCC"),
    ("Ada", "#02f88c"),
    ("Assembly", "#6E4C13"),
    ("Astro", "#ff5a03"),
    ("Batchfile", "#C1F12E"),
    ("C", "#555555"),
    ("C#", "#178600"),
    ("C++", "#f34b7d"),
    ("CMake", "#DA3434"),
    ("COBOL", "#000000"),
    ("CSS", "#563d7c"),
    ("Clojure", "#db5855"),
    ("CoffeeScript", "#244776"),
    ("Common Lisp", "#3fb68b"),
    ("Crystal", "#000100"),
    ("D", "#ba595e"),
    ("Dart", "#00B4AB"),
    ("Dockerfile", "#384d54"),
    ("Elixir", "#6e4a7e"),
    ("Elm", "#60B5CC"),
    ("Emacs Lisp", "#c065db"),
    ("Erlang", "#B83998"),
    ("F#", "#b845fc"),
    ("Fortran", "#4d41b1"),
    ("GDScript", "#355570"),
    ("GLSL", "#5686a5"),
    ("Go", "#00ADD8"),
    ("Groovy", "#4298b8"),
    ("HCL", "#844FBA"),
    ("HTML", "#e34c26"),
    ("Haskell", "#5e5086"),
    ("Java", "#b07219"),
    ("JavaScript", "#f1e05a"),
    ("Julia", "#a270ba"),
    ("Jupyter Notebook", "#DA5B0B"),
    ("Kotlin", "#A97BFF"),
    ("Lua", "#000080"),
    ("MATLAB", "#e16737"),
    ("Makefile", "#427819"),
    ("Nim", "#ffc200"),
    ("Nix", "#7e7eff"),
    ("OCaml", "#3be133"),
    ("Objective-C", "#438eff"),
    ("PHP", "#4F5D95"),
    ("Perl", "#0298c3"),
    ("PowerShell", "#012456"),
    ("Prolog", "#74283c"),
    ("PureScript", "#1D222D"),
    ("Python", "#3572A5"),
    ("R", "#198CE7"),
    ("Racket", "#3c5caa"),
    ("Ruby", "#701516"),
    ("Rust", "#dea584"),
    ("Scala", "#c22d40"),
    ("Scheme", "#1e4aec"),
    ("Shell", "#89e051"),
    ("Smalltalk", "#596706"),
    ("Solidity", "#AA6746"),
    ("Svelte", "#ff3e00"),
    ("Swift", "#F05138"),
    ("TeX", "#3D6117"),
    ("TypeScript", "#3178c6"),
    ("V", "#4f87c4"),
    ("Vim Script", "#199f4b"),
    ("Vue", "#41b883"),
    ("Zig", "#ec915c"),
];

/// Resolve a language name to its display color.
pub(crate) fn language_color(name: &str) -> &'static str {
    LANGUAGE_COLORS
        .iter()
        .find(|(lang, _)| *lang == name)
        .map_or(DEFAULT_COLOR, |(_, color)| color)
}

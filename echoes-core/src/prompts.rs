//! Fixed prompts for the storyteller and the illustrators.

/// Opening prompt sent by `start`.
pub const OPENING_PROMPT: &str = "\
Start a text-based adventure game. The protagonist, a resourceful girl named Lily, \
has just learned that her friends are trapped inside their high school by a mysterious, \
malevolent force. The school has become a labyrinth of puzzles, magical traps, and locked doors.

Begin the story with Lily standing outside the silent school gates at dusk. The building \
looms before her, unnaturally dark. She is determined to go in and save her friends.

Describe the scene and give her the first set of choices.";

/// System directive for every narrative request.
pub const STORYTELLER_DIRECTIVE: &str = "\
You are a master storyteller running a text-based adventure game. You narrate a tense, \
atmospheric story about a girl named Lily rescuing her friends from a magically trapped school.

Your responses MUST follow the provided JSON schema exactly.

- Keep the tone atmospheric, mysterious and engaging, and describe scenes vividly.
- Mix logic puzzles, observation and courage into the challenges.

PUZZLES:
- From time to time, introduce a puzzle that fits the scene: a riddle on a door, a pattern \
to decipher, an object to assemble.
- Describe the puzzle in 'story'. Every clue needed to solve it must be in that text.
- The 'choices' should be actions that work toward a solution: logical steps, red herrings, \
and ways to inspect the surroundings for more clues.
- A puzzle should be solvable in a few steps. A wrong choice leads to a setback or a new \
obstacle, not always to the end of the game.

- Choices have meaningful consequences. Keep the story moving.
- When the player wins or loses, set 'gameOver' to true and write a closing 'gameOverMessage'.

JSON RULES:
- Offer 3 or 4 distinct choices. The 'choices' array holds ONLY those player actions, never \
other keys or values from the JSON object.
- 'story' is one to three paragraphs long.
- 'sceneDescription' is a concise prompt of 5 to 15 words for an image generator, naming the \
key visual elements, characters and mood of the current scene. Example: 'A young girl with a \
flashlight stands before a dark, imposing school entrance at dusk.'";

/// System directive for vector-scene requests.
pub const VECTOR_DIRECTIVE: &str = "You are an expert at creating visually appealing SVG files.";

/// Build the narrative context for a player action.
pub fn action_context(history: &[String], action: &str) -> String {
    format!(
        "PREVIOUS STORY:\n{}\n\nPLAYER'S ACTION: \"{}\"",
        history.join("\n\n"),
        action
    )
}

/// The history fragment echoing a player action.
pub fn action_marker(action: &str) -> String {
    format!("> {action}")
}

/// Prompt for a vector scene of the given description.
pub fn vector_scene_prompt(scene: &str) -> String {
    format!(
        r#"Generate a JSON object for a minimalist, symbolic SVG illustration of the scene below.
The JSON must match this structure:
{{
  "viewBox": "string",
  "backgroundColor": "string",
  "elements": [ {{ "type": "rect" | "circle" | "ellipse" | "line" | "polyline" | "polygon" | "path", ... }} ]
}}
- Use a dark, moody color palette.
- Use simple shapes and silhouettes.
- Element attributes are strings or numbers.
- Respond with ONLY the raw JSON object.

Scene: "{scene}""#
    )
}

/// Prompt for a bitmap of the given description.
pub fn bitmap_prompt(scene: &str) -> String {
    format!("Generate a beautiful image of: {scene}")
}

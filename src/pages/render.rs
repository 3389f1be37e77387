//! HTML fragments for the server-rendered pages.
//!
//! Every value that came from a user goes through [`escape`] before it is
//! spliced into markup.

use axum::response::Html;
use url::form_urlencoded;

use crate::{
    authentication::AuthUser,
    models::{Category, Comment, Difficulty, Profile, Recipe, Tag},
};

pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Five stars, filled up to the rounded average.
pub fn stars(average: f64) -> String {
    let filled = average.round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Paragraph breaks for multi-line text fields.
fn paragraphs(value: &str) -> String {
    value
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("<p>{}</p>", escape(line)))
        .collect()
}

pub fn layout(title: &str, user: Option<&AuthUser>, notice: Option<&str>, body: &str) -> Html<String> {
    let account = match user {
        Some(user) => format!(
            r#"<a href="/recipe/create/">New recipe</a>
      <a href="/profile/{name}/">{name}</a>
      <form method="post" action="/accounts/logout/" class="inline"><button type="submit">Log out</button></form>"#,
            name = escape(&user.username)
        ),
        None => r#"<a href="/accounts/login/">Log in</a>
      <a href="/register/">Register</a>"#
            .to_string(),
    };
    let notice = notice
        .map(|notice| format!(r#"<div class="notice">{}</div>"#, escape(notice)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title} | Recipe Box</title>
</head>
<body>
  <header>
    <nav>
      <a href="/">Recipe Box</a>
      <a href="/categories/">Categories</a>
      {account}
    </nav>
  </header>
  {notice}
  <main>
{body}
  </main>
</body>
</html>"#,
        title = escape(title),
    ))
}

pub fn error_page(title: &str, message: &str) -> Html<String> {
    layout(
        title,
        None,
        None,
        &format!("<h1>{}</h1>\n<p>{}</p>", escape(title), escape(message)),
    )
}

pub fn recipe_cards(recipes: &[Recipe]) -> String {
    if recipes.is_empty() {
        return "<p>No recipes yet.</p>".to_string();
    }
    let mut html = String::from(r#"<ul class="recipes">"#);
    for recipe in recipes {
        html.push_str(&format!(
            r#"
  <li>
    <a href="/recipe/{id}/">{title}</a>
    <span class="meta">by {author} · {minutes} min · {difficulty} · {stars} ({average:.1})</span>
  </li>"#,
            id = recipe.id,
            title = escape(&recipe.title),
            author = escape(&recipe.author_username),
            minutes = recipe.total_time(),
            difficulty = recipe.difficulty.as_str(),
            stars = stars(recipe.average_rating()),
            average = recipe.average_rating(),
        ));
    }
    html.push_str("\n</ul>");
    html
}

fn link_list(prefix: &str, items: impl Iterator<Item = (i64, String)>) -> String {
    let mut html = String::from("<ul>");
    for (id, name) in items {
        html.push_str(&format!(r#"<li><a href="/{prefix}/{id}/">{}</a></li>"#, escape(&name)));
    }
    html.push_str("</ul>");
    html
}

pub fn category_links(categories: &[Category]) -> String {
    link_list(
        "category",
        categories.iter().map(|category| (category.id, category.name.clone())),
    )
}

pub fn tag_links(tags: &[Tag]) -> String {
    link_list("tag", tags.iter().map(|tag| (tag.id, tag.name.clone())))
}

/// Previous/next links for a 1-based page of `total_pages`.
pub fn pager(base: &str, query: Option<&str>, page: u64, total_pages: u64) -> String {
    if total_pages <= 1 {
        return String::new();
    }
    let link = |number: u64| match query {
        Some(q) => format!(
            "{base}?{}",
            form_urlencoded::Serializer::new(String::new())
                .append_pair("q", q)
                .append_pair("page", &number.to_string())
                .finish()
        ),
        None => format!("{base}?page={number}"),
    };
    let mut html = String::from(r#"<nav class="pager">"#);
    if page > 1 {
        html.push_str(&format!(r#"<a href="{}">Previous</a> "#, link(page - 1)));
    }
    html.push_str(&format!("Page {page} of {total_pages}"));
    if page < total_pages {
        html.push_str(&format!(r#" <a href="{}">Next</a>"#, link(page + 1)));
    }
    html.push_str("</nav>");
    html
}

pub fn recipe_detail(
    recipe: &Recipe,
    tags: &[Tag],
    comments: &[Comment],
    viewer: Option<&AuthUser>,
) -> String {
    let mut html = format!(
        r#"<article class="recipe">
  <h1>{title}</h1>
  <p class="meta">by <a href="/profile/{author}/">{author}</a>{category}</p>
  <p class="rating">{stars} {average:.1} / 5 ({ratings} ratings)</p>
  <p>Prep {prep} min · Cook {cook} min · Total {total} min · Serves {servings} · {difficulty}</p>
  {tags}
  <section class="description">{description}</section>
  <h2>Ingredients</h2>
  <section class="ingredients">{ingredients}</section>
  <h2>Instructions</h2>
  <section class="instructions">{instructions}</section>
</article>"#,
        title = escape(&recipe.title),
        author = escape(&recipe.author_username),
        category = match (recipe.category_id, &recipe.category_name) {
            (Some(id), Some(name)) => format!(r#" in <a href="/category/{id}/">{}</a>"#, escape(name)),
            _ => String::new(),
        },
        stars = stars(recipe.average_rating()),
        average = recipe.average_rating(),
        ratings = recipe.scores().len(),
        prep = recipe.prep_time.unwrap_or_default(),
        cook = recipe.cook_time.unwrap_or_default(),
        total = recipe.total_time(),
        servings = recipe.servings,
        difficulty = recipe.difficulty.as_str(),
        tags = if tags.is_empty() { String::new() } else { tag_links(tags) },
        description = paragraphs(&recipe.description),
        ingredients = paragraphs(&recipe.ingredients),
        instructions = paragraphs(&recipe.instructions),
    );

    if viewer.map(|viewer| viewer.id) == Some(recipe.author_id) {
        html.push_str(&format!(
            r#"<p><a href="/recipe/{}/edit/">Edit recipe</a></p>"#,
            recipe.id
        ));
    }

    html.push_str(&format!("\n<h2>Comments ({})</h2>", comments.len()));
    for comment in comments {
        html.push_str(&format!(
            r#"
<div class="comment"><strong>{}</strong> <time>{}</time><p>{}</p></div>"#,
            escape(&comment.user_username),
            comment.created_at.format("%Y-%m-%d %H:%M"),
            escape(&comment.text),
        ));
    }

    html.push_str(&format!(
        r#"
<form method="post" action="/recipe/{id}/">
  <label>Comment <textarea name="text" rows="3"></textarea></label>
  <button type="submit">Add comment</button>
</form>
<form method="post" action="/recipe/{id}/">
  <label>Score <select name="score">{options}</select></label>
  <button type="submit">Rate</button>
</form>"#,
        id = recipe.id,
        options = (1..=5)
            .map(|score| format!(r#"<option value="{score}">{score}</option>"#))
            .collect::<String>(),
    ));
    html
}

/// Values pre-filled into the recipe form.
#[derive(Debug, Default)]
pub struct RecipeFormValues {
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub category_id: Option<i64>,
    pub tags: String,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub published: bool,
    pub image: String,
}

impl RecipeFormValues {
    pub fn from_recipe(recipe: &Recipe, tags: &[Tag]) -> Self {
        RecipeFormValues {
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            category_id: recipe.category_id,
            tags: tags
                .iter()
                .map(|tag| tag.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            published: recipe.published,
            image: recipe.image.clone().unwrap_or_default(),
        }
    }
}

pub fn recipe_form(action: &str, values: &RecipeFormValues, categories: &[Category]) -> String {
    let category_options: String = std::iter::once(r#"<option value="">---------</option>"#.to_string())
        .chain(categories.iter().map(|category| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                category.id,
                if values.category_id == Some(category.id) { " selected" } else { "" },
                escape(&category.name)
            )
        }))
        .collect();
    let difficulty_options: String = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
        .iter()
        .map(|difficulty| {
            format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                difficulty.as_str(),
                if values.difficulty == *difficulty { " selected" } else { "" }
            )
        })
        .collect();
    let number = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();

    format!(
        r#"<form method="post" action="{action}">
  <label>Title <input name="title" value="{title}" maxlength="200" required></label>
  <label>Description <textarea name="description" rows="3">{description}</textarea></label>
  <label>Ingredients <textarea name="ingredients" rows="5">{ingredients}</textarea></label>
  <label>Instructions <textarea name="instructions" rows="10">{instructions}</textarea></label>
  <label>Category <select name="category_id">{category_options}</select></label>
  <label>Tags <input name="tags" value="{tags}" placeholder="comma, separated"></label>
  <label>Prep time (min) <input name="prep_time" type="number" min="0" value="{prep}"></label>
  <label>Cook time (min) <input name="cook_time" type="number" min="0" value="{cook}"></label>
  <label>Servings <input name="servings" type="number" min="1" value="{servings}"></label>
  <label>Difficulty <select name="difficulty">{difficulty_options}</select></label>
  <label>Published <input name="published" type="checkbox" value="on"{published}></label>
  <label>Image URL <input name="image" value="{image}"></label>
  <button type="submit">Save</button>
</form>"#,
        action = escape(action),
        title = escape(&values.title),
        description = escape(&values.description),
        ingredients = escape(&values.ingredients),
        instructions = escape(&values.instructions),
        tags = escape(&values.tags),
        prep = number(values.prep_time),
        cook = number(values.cook_time),
        servings = values.servings,
        published = if values.published { " checked" } else { "" },
        image = escape(&values.image),
    )
}

pub fn profile(profile: &Profile, recipes: &[Recipe], is_self: bool) -> String {
    let optional = |label: &str, value: &Option<String>| {
        value
            .as_deref()
            .map(|value| format!("<p>{label}: {}</p>", escape(value)))
            .unwrap_or_default()
    };
    format!(
        r#"<section class="profile">
  <h1>{username}</h1>
  {avatar}
  <p>{bio}</p>
  {location}{website}
  <p>{followers} followers · {following} following</p>
  {edit}
</section>
<h2>Recipes</h2>
{recipes}"#,
        username = escape(&profile.username),
        avatar = profile
            .avatar
            .as_deref()
            .map(|src| format!(r#"<img src="{}" alt="avatar">"#, escape(src)))
            .unwrap_or_default(),
        bio = escape(&profile.bio),
        location = optional("Location", &profile.location),
        website = optional("Website", &profile.website),
        followers = profile.followers_count,
        following = profile.following_count,
        edit = if is_self {
            r#"<a href="/profile/edit/">Edit profile</a>"#
        } else {
            ""
        },
        recipes = recipe_cards(recipes),
    )
}

pub fn profile_form(profile: &Profile) -> String {
    let value = |field: &Option<String>| escape(field.as_deref().unwrap_or_default());
    format!(
        r#"<h1>Edit profile</h1>
<form method="post" action="/profile/edit/">
  <label>Bio <textarea name="bio" rows="4">{bio}</textarea></label>
  <label>Avatar URL <input name="avatar" value="{avatar}"></label>
  <label>Location <input name="location" value="{location}"></label>
  <label>Website <input name="website" value="{website}"></label>
  <button type="submit">Save</button>
</form>"#,
        bio = escape(&profile.bio),
        avatar = value(&profile.avatar),
        location = value(&profile.location),
        website = value(&profile.website),
    )
}

pub fn login_form(next: Option<&str>) -> String {
    format!(
        r#"<h1>Log in</h1>
<form method="post" action="/accounts/login/">
  <input type="hidden" name="next" value="{next}">
  <label>Username <input name="username" required></label>
  <label>Password <input name="password" type="password" required></label>
  <button type="submit">Log in</button>
</form>
<p>No account? <a href="/register/">Register</a></p>"#,
        next = escape(next.unwrap_or("/")),
    )
}

pub fn register_form() -> &'static str {
    r#"<h1>Register</h1>
<form method="post" action="/register/">
  <label>Username <input name="username" maxlength="150" required></label>
  <label>Email <input name="email" type="email" required></label>
  <label>Password <input name="password1" type="password" required></label>
  <label>Password confirmation <input name="password2" type="password" required></label>
  <button type="submit">Register</button>
</form>"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_is_escaped() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn stars_round_the_average() {
        assert_eq!(stars(0.0), "☆☆☆☆☆");
        assert_eq!(stars(4.0), "★★★★☆");
        assert_eq!(stars(4.6), "★★★★★");
        assert_eq!(stars(2.4), "★★☆☆☆");
    }

    #[test]
    fn pager_keeps_search_term() {
        let html = pager("/", Some("pasta"), 2, 3);
        assert!(html.contains(r#"href="/?q=pasta&page=1""#));
        assert!(html.contains(r#"href="/?q=pasta&page=3""#));
        assert_eq!(pager("/", None, 1, 1), "");
        assert!(pager("/", Some("mac & cheese"), 1, 2).contains("q=mac+%26+cheese&page=2"));
    }
}

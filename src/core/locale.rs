//! Every user- and model-facing phrase, one table per output language.
//!
//! Templates use `{name}` placeholders filled by [`render`].

use crate::core::params::OutputLanguage;

pub struct Strings {
    // outline request
    pub outline_system: &'static str,
    pub outline_task: &'static str,
    pub publication_params: &'static str,
    pub param_type: &'static str,
    pub param_tone: &'static str,
    pub param_audience: &'static str,
    pub param_topic: &'static str,
    pub base_material: &'static str,
    pub structure_requirements: &'static str,
    pub outline_word_count: &'static str,
    pub outline_chapters: &'static str,
    pub outline_sections: &'static str,
    pub outline_casing: &'static str,
    pub outline_json_shape: &'static str,

    // section request
    pub section_system: &'static str,
    pub section_task: &'static str,
    pub book_context: &'static str,
    pub context_topic: &'static str,
    pub section_to_write: &'static str,
    pub context_chapter: &'static str,
    pub context_section: &'static str,
    pub writing_instructions: &'static str,
    pub section_word_count: &'static str,
    pub section_style: &'static str,
    pub search_scholar: &'static str,
    pub search_web: &'static str,
    pub citations: &'static str,
    pub dialogue: &'static str,
    pub no_heading: &'static str,
    pub reference_sentinel: &'static str,

    // reference consolidation
    pub references_system: &'static str,
    pub references_task: &'static str,
    pub references_rules: &'static str,

    // progress labels
    pub task_outline: &'static str,
    pub task_introduction: &'static str,
    pub task_section: &'static str,
    pub task_conclusion: &'static str,
    pub task_references: &'static str,
    pub task_done: &'static str,

    // structural names
    pub introduction: &'static str,
    pub conclusion: &'static str,
    pub chapter: &'static str,
    pub references: &'static str,

    // errors
    pub err_empty_topic: &'static str,
    pub err_chapter_count: &'static str,
    pub err_target_words: &'static str,
    pub err_outline: &'static str,
    pub err_section: &'static str,
    pub err_references: &'static str,
}

const ES: Strings = Strings {
    outline_system: "Eres un experto editor y planificador de contenido. Tu tarea es estructurar un libro completo a partir de un tema y unos parámetros específicos. Tu respuesta debe ser únicamente el objeto JSON solicitado, sin explicaciones adicionales.",
    outline_task: "Crea una estructura detallada para un libro basado en el siguiente artículo/tema. Toda la respuesta, incluyendo títulos y secciones, debe estar en español.",
    publication_params: "**Parámetros de la publicación:**",
    param_type: "- **Tipo:**",
    param_tone: "- **Tono:**",
    param_audience: "- **Público objetivo:**",
    param_topic: "- **Tema principal:**",
    base_material: "**Material de base proporcionado por el usuario (usa esto como fuente principal):**",
    structure_requirements: "**Requisitos de la estructura:**",
    outline_word_count: "- El libro debe tener una extensión aproximada de {words} palabras.",
    outline_chapters: "- Debe incluir una introducción, una conclusión y {chapters} capítulos principales.",
    outline_sections: "- Cada capítulo debe estar dividido en 3 a 5 secciones lógicas.",
    outline_casing: "- Aplica la regla de mayúscula inicial solo en la primera palabra y nombres propios para todos los títulos y subtítulos.",
    outline_json_shape: "- Devuelve un objeto JSON con la forma {\"title\": \"...\", \"introduction\": {\"title\": \"...\"}, \"chapters\": [{\"title\": \"...\", \"sections\": [\"...\"]}], \"conclusion\": {\"title\": \"...\"}}.",

    section_system: "Eres un escritor académico experto en investigación y redacción. Tu objetivo es escribir contenido de alta calidad, bien referenciado en formato APA 7, adaptando tu estilo a los parámetros especificados. Prioriza la información del material de base proporcionado por el usuario si está disponible.",
    section_task: "Tu tarea es escribir el contenido para una sección específica de un libro. La respuesta debe ser en español.",
    book_context: "**Contexto del libro:**",
    context_topic: "- **Tema general:**",
    section_to_write: "**Sección a escribir:**",
    context_chapter: "- **Capítulo:**",
    context_section: "- **Sección:**",
    writing_instructions: "**Instrucciones de escritura:**",
    section_word_count: "- El texto de esta sección debe tener aproximadamente {words} palabras.",
    section_style: "- Escribe con el tono y la complejidad adecuados para una publicación de tipo '{publication}' dirigida a {audience}. Para publicaciones académicas o técnicas, utiliza un lenguaje preciso y bien estructurado. Para difusión general, usa un lenguaje más accesible.",
    search_scholar: "- Investiga y utiliza fuentes fiables usando exclusivamente Google Académico (Google Scholar) para respaldar TODAS las afirmaciones. Prioriza artículos científicos, tesis y publicaciones académicas revisadas por pares.",
    search_web: "- Investiga y utiliza fuentes fiables usando la búsqueda de Google para respaldar TODAS las afirmaciones.",
    citations: "- Inserta citas en formato APA (Autor, Año) directamente en el texto donde sea necesario.",
    dialogue: "- Si incluyes diálogos, utiliza el guion largo (—).",
    no_heading: "- No repitas el título de la sección al comienzo del texto y no añadas una lista de referencias al final.",
    reference_sentinel: "###REFERENCIAS###",

    references_system: "Eres un bibliotecario experto en normas APA 7. Tu respuesta debe contener únicamente las referencias solicitadas, una por línea.",
    references_task: "Las siguientes fuentes se consultaron para escribir un libro sobre \"{topic}\". Redacta la referencia completa en formato APA 7 de cada una.",
    references_rules: "- Ordena las referencias alfabéticamente por el apellido del autor.\n- Escribe una referencia por línea, sin numeración, viñetas ni texto adicional.",

    task_outline: "Generando estructura del libro...",
    task_introduction: "Escribiendo introducción: {title}",
    task_section: "Capítulo {chapter}/{chapters}: Escribiendo sección \"{title}\"",
    task_conclusion: "Escribiendo conclusión: {title}",
    task_references: "Consolidando referencias...",
    task_done: "Libro completado",

    introduction: "Introducción",
    conclusion: "Conclusión",
    chapter: "Capítulo",
    references: "Referencias",

    err_empty_topic: "Por favor, introduce un tema o un artículo.",
    err_chapter_count: "El número de capítulos debe estar entre {min} y {max} (se recibió {value}).",
    err_target_words: "La extensión del libro debe estar entre {min} y {max} palabras (se recibió {value}).",
    err_outline: "No se pudo generar la estructura del libro. Por favor, revisa el registro para más detalles.",
    err_section: "No se pudo generar el contenido para la sección \"{title}\".",
    err_references: "No se pudo consolidar la lista de referencias.",
};

const EN: Strings = Strings {
    outline_system: "You are an expert editor and content planner. Your task is to structure a complete book from a topic and specific parameters. Your response must be solely the requested JSON object, with no additional explanations.",
    outline_task: "Create a detailed book outline based on the following topic/article. The entire response, including all titles and sections, must be in English.",
    publication_params: "**Publication Parameters:**",
    param_type: "- **Type:**",
    param_tone: "- **Tone:**",
    param_audience: "- **Target Audience:**",
    param_topic: "- **Main Topic:**",
    base_material: "**Base material provided by user (use this as the primary source):**",
    structure_requirements: "**Structure Requirements:**",
    outline_word_count: "- The book should have an approximate length of {words} words.",
    outline_chapters: "- It must include an introduction, a conclusion, and {chapters} main chapters.",
    outline_sections: "- Each chapter should be divided into 3 to 5 logical sections.",
    outline_casing: "- For all titles and subtitles, use title case (capitalize the first letter of each major word).",
    outline_json_shape: "- Return a JSON object shaped as {\"title\": \"...\", \"introduction\": {\"title\": \"...\"}, \"chapters\": [{\"title\": \"...\", \"sections\": [\"...\"]}], \"conclusion\": {\"title\": \"...\"}}.",

    section_system: "You are an expert academic writer specializing in research and composition. Your goal is to write high-quality, well-referenced content in APA 7 format, adapting your style to the specified parameters. Prioritize information from the user-provided base material if available.",
    section_task: "Your task is to write the content for a specific section of a book. The response must be in English.",
    book_context: "**Book Context:**",
    context_topic: "- **Overall Topic:**",
    section_to_write: "**Section to Write:**",
    context_chapter: "- **Chapter:**",
    context_section: "- **Section:**",
    writing_instructions: "**Writing Instructions:**",
    section_word_count: "- The text for this section should be approximately {words} words.",
    section_style: "- Write with the appropriate tone and complexity for a '{publication}' publication aimed at {audience}. For academic or technical publications, use precise and well-structured language. For general dissemination, use more accessible language.",
    search_scholar: "- Research and use reliable sources using exclusively Google Scholar to back up ALL claims. Prioritize peer-reviewed scientific articles, theses, and academic publications.",
    search_web: "- Research and use reliable sources using Google Search to back up ALL claims.",
    citations: "- Insert citations in APA (Author, Year) format directly in the text where necessary.",
    dialogue: "- If you include dialogue, use em dashes (—).",
    no_heading: "- Do not repeat the section title at the start of the text and do not append a reference list at the end.",
    reference_sentinel: "###REFERENCES###",

    references_system: "You are a librarian who is an expert in APA 7 style. Your response must contain only the requested references, one per line.",
    references_task: "The following sources were consulted while writing a book about \"{topic}\". Write the full APA 7 reference for each of them.",
    references_rules: "- Sort the references alphabetically by the author's surname.\n- Write one reference per line, with no numbering, bullets or extra text.",

    task_outline: "Generating book outline...",
    task_introduction: "Writing introduction: {title}",
    task_section: "Chapter {chapter}/{chapters}: Writing section \"{title}\"",
    task_conclusion: "Writing conclusion: {title}",
    task_references: "Consolidating references...",
    task_done: "Book complete",

    introduction: "Introduction",
    conclusion: "Conclusion",
    chapter: "Chapter",
    references: "References",

    err_empty_topic: "Please enter a topic or an article.",
    err_chapter_count: "The number of chapters must be between {min} and {max} (got {value}).",
    err_target_words: "The book length must be between {min} and {max} words (got {value}).",
    err_outline: "Could not generate the book outline. Please check the log for more details.",
    err_section: "Could not generate content for section \"{title}\".",
    err_references: "Could not consolidate the reference list.",
};

pub fn strings(lang: OutputLanguage) -> &'static Strings {
    match lang {
        OutputLanguage::Es => &ES,
        OutputLanguage::En => &EN,
    }
}

/// Fills `{key}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

/// Thousands-grouped integer as each language writes it (25.000 / 25,000).
pub fn format_number(n: u32, lang: OutputLanguage) -> String {
    let sep = match lang {
        OutputLanguage::Es => '.',
        OutputLanguage::En => ',',
    };
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}
